use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// An exam definition. Read-only to the grading core: the CRUD surface
/// that creates and edits exams lives in the calling layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "exams")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub title: String,
    /// Teacher who owns the exam; only they may publish its results.
    pub created_by: i64,

    /// Attempt window start (inclusive).
    pub starts_at: DateTime<Utc>,
    /// Attempt window end (exclusive).
    pub ends_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Owner,

    #[sea_orm(has_many = "super::question::Entity")]
    Questions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C>(
        db: &C,
        title: &str,
        created_by: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        let active_model = ActiveModel {
            title: Set(title.to_owned()),
            created_by: Set(created_by),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    /// Whether the attempt window is open at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// Sum of the exam's question marks. The exam total is derived, never
    /// stored, so edits to questions cannot leave it stale.
    pub async fn total_marks<C>(db: &C, exam_id: i64) -> Result<f64, DbErr>
    where
        C: ConnectionTrait,
    {
        let questions = super::question::Entity::find()
            .filter(super::question::Column::ExamId.eq(exam_id))
            .all(db)
            .await?;

        Ok(questions.iter().map(|q| q.marks).sum())
    }
}
