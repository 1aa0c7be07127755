use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202602100001_create_users::Migration),
            Box::new(migrations::m202602100002_create_modules::Migration),
            Box::new(migrations::m202602100003_create_user_module_roles::Migration),
            Box::new(migrations::m202602170001_create_attendance::Migration),
        ]
    }
}
