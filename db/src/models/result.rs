use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "result_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResultStatus {
    /// Placeholder row, attempt not yet finalized.
    #[sea_orm(string_value = "pending")]
    Pending,

    /// Student finalized their attempt.
    #[sea_orm(string_value = "completed")]
    Completed,

    /// Aggregated under a publication run.
    #[sea_orm(string_value = "graded")]
    Graded,
}

/// Per-student aggregate for one exam: total marks, percentage, rank and
/// publication visibility. Recomputed while unpublished; frozen in content
/// once published (unpublishing only flips visibility).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub exam_id: i64,
    pub student_id: i64,

    pub total_marks: f64,
    pub percentage: f64,
    /// 1-based competition rank; `None` until aggregation has run.
    pub rank: Option<i64>,

    pub status: ResultStatus,
    pub is_published: bool,

    pub evaluated_by: Option<i64>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,

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
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::exam::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exam.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_by_exam_and_student<C>(
        db: &C,
        exam_id: i64,
        student_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .filter(Column::StudentId.eq(student_id))
            .one(db)
            .await
    }

    pub async fn find_for_exam<C>(db: &C, exam_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .order_by_desc(Column::TotalMarks)
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    pub async fn create<C>(
        db: &C,
        exam_id: i64,
        student_id: i64,
        total_marks: f64,
        percentage: f64,
        status: ResultStatus,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        let active_model = ActiveModel {
            exam_id: Set(exam_id),
            student_id: Set(student_id),
            total_marks: Set(total_marks),
            percentage: Set(percentage),
            rank: Set(None),
            status: Set(status),
            is_published: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }
}
