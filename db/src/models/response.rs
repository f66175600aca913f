use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A student's submitted answer for one question of one exam.
///
/// The `(exam_id, question_id, student_id)` triple is unique; a
/// resubmission overwrites the row rather than adding another. The
/// `marks_obtained`/`is_correct` mirror fields are maintained by the auto
/// grader and the grading ledger; the grading history itself lives in
/// `grading_records`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub exam_id: i64,
    pub question_id: i64,
    pub student_id: i64,

    pub answer_text: String,
    /// Mirror of the current grade. May be negative for an incorrectly
    /// answered objective question with negative marking.
    pub marks_obtained: f64,
    /// `Some` once graded: exact for objective questions, derived for
    /// manually graded ones. `None` while ungraded.
    pub is_correct: Option<bool>,

    pub submitted_at: DateTime<Utc>,
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
        belongs_to = "super::question::Entity",
        from = "Column::QuestionId",
        to = "super::question::Column::Id"
    )]
    Question,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,

    #[sea_orm(has_many = "super::grading_record::Entity")]
    GradingRecords,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::grading_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradingRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_by_triple<C>(
        db: &C,
        exam_id: i64,
        question_id: i64,
        student_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .filter(Column::QuestionId.eq(question_id))
            .filter(Column::StudentId.eq(student_id))
            .one(db)
            .await
    }

    pub async fn find_for_student<C>(
        db: &C,
        exam_id: i64,
        student_id: i64,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .filter(Column::StudentId.eq(student_id))
            .all(db)
            .await
    }

    pub async fn find_for_exam<C>(db: &C, exam_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ExamId.eq(exam_id))
            .all(db)
            .await
    }

    /// Distinct students who submitted at least one response for the exam.
    pub async fn student_ids_for_exam<C>(db: &C, exam_id: i64) -> Result<Vec<i64>, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut ids: Vec<i64> = Self::find_for_exam(db, exam_id)
            .await?
            .into_iter()
            .map(|r| r.student_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Update the grade mirror on a response row.
    pub async fn set_grade<C>(
        db: &C,
        response: Model,
        marks_obtained: f64,
        is_correct: Option<bool>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active: ActiveModel = response.into();
        active.marks_obtained = Set(marks_obtained);
        active.is_correct = Set(is_correct);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}
