use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "publication_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PublicationStatus {
    #[sea_orm(string_value = "not_published")]
    NotPublished,

    #[sea_orm(string_value = "published")]
    Published,
}

impl Default for PublicationStatus {
    fn default() -> Self {
        Self::NotPublished
    }
}

/// Per-exam publication state. One row per exam, created on first publish.
///
/// Legal transitions: NotPublished -> Published (only when every attempted
/// student is fully graded) and Published -> NotPublished.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "exam_publications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub exam_id: i64,
    pub status: PublicationStatus,

    /// Distinct students with at least one response, at last publish.
    pub total_students: i64,
    /// Of those, students whose every response was graded, at last publish.
    pub graded_students: i64,

    /// Pass threshold chosen by the publisher, not derived from the exam.
    pub passing_percentage: Option<f64>,

    pub published_by: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::exam::Entity",
        from = "Column::ExamId",
        to = "super::exam::Column::Id"
    )]
    Exam,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PublishedBy",
        to = "super::user::Column::Id"
    )]
    Publisher,
}

impl Related<super::exam::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exam.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_by_exam<C>(db: &C, exam_id: i64) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .one(db)
            .await
    }

    /// Whether results for the exam are currently visible to students.
    pub async fn is_published<C>(db: &C, exam_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Self::find_by_exam(db, exam_id)
            .await?
            .map(|p| p.status == PublicationStatus::Published)
            .unwrap_or(false))
    }
}
