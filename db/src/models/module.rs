use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, Set};
use serde::Serialize;

/// Represents a module (course offering) in the `modules` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "modules")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Module code such as `COS301`. Unique per year.
    pub code: String,
    /// Academic year this offering belongs to.
    pub year: i32,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Credit value of the module.
    pub credits: i32,
    /// Timestamp when the module was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the module was last updated.
    pub updated_at: DateTime<Utc>,
}

/// This enum would define relations if any exist. Currently unused.
#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("No RelationDef implemented")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        year: i32,
        description: Option<&str>,
        credits: i32,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let module = ActiveModel {
            code: Set(code.to_owned()),
            year: Set(year),
            description: Set(description.map(str::to_owned)),
            credits: Set(credits),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        module.insert(db).await
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }
}
