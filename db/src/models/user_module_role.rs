use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The central table for user-module-role relationships.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_module_roles")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Module ID (foreign key to `modules`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub module_id: i64,

    /// Role the user holds in this module.
    pub role: Role,
}

/// Enum representing user roles within a module.
/// Backed by a `user_module_role_type` enum in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_module_role_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "lecturer")]
    Lecturer,

    #[sea_orm(string_value = "assistant_lecturer")]
    AssistantLecturer,

    #[sea_orm(string_value = "tutor")]
    Tutor,

    #[sea_orm(string_value = "student")]
    Student,
}

/// Defines relationships for foreign key joins.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Belongs to a user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    /// Belongs to a module
    #[sea_orm(
        belongs_to = "super::module::Entity",
        from = "Column::ModuleId",
        to = "super::module::Column::Id"
    )]
    Module,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Module.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Assigns `role` to a user in a module. Each (user, module) pair holds
    /// at most one role, enforced by the composite primary key.
    pub async fn assign_user_to_module(
        db: &DatabaseConnection,
        user_id: i64,
        module_id: i64,
        role: Role,
    ) -> Result<Model, DbErr> {
        let assignment = ActiveModel {
            user_id: Set(user_id),
            module_id: Set(module_id),
            role: Set(role),
        };
        assignment.insert(db).await
    }

    /// The single role the user holds in the module, if any.
    pub async fn find_role(
        db: &DatabaseConnection,
        user_id: i64,
        module_id: i64,
    ) -> Result<Option<Role>, DbErr> {
        let assignment = Entity::find_by_id((user_id, module_id)).one(db).await?;
        Ok(assignment.map(|a| a.role))
    }
}
