//! TestRun entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_runs")]
pub struct Model {
    /// Opaque id assigned at dispatch; the webhook correlation key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: String,
    pub environment: Option<String>,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub commit_sha: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub commit_message: Option<String>,
    pub workflow_url: Option<String>,
    pub artifact_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_step::Entity")]
    TestSteps,
}

impl Related<super::test_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
