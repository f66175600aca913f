use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::DeriveActiveEnum;
use sea_orm::QueryFilter;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a question is graded.
#[derive(
    Debug, Clone, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "question_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum QuestionType {
    /// Single predetermined correct option; graded without human judgment.
    #[sea_orm(string_value = "objective")]
    Objective,

    /// Short free-text answer, manually graded.
    #[sea_orm(string_value = "short_answer")]
    ShortAnswer,

    /// Long free-text answer, manually graded.
    #[sea_orm(string_value = "subjective")]
    Subjective,
}

impl QuestionType {
    pub fn is_objective(&self) -> bool {
        matches!(self, QuestionType::Objective)
    }
}

/// A question within an exam. Read-only to the grading core.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub exam_id: i64,
    pub question_type: QuestionType,
    pub text: String,

    /// Marks awarded for a fully correct answer. Always positive.
    pub marks: f64,
    /// Marks deducted for an incorrect objective answer. Never negative.
    pub negative_marks: f64,

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

    #[sea_orm(has_many = "super::question_option::Entity")]
    Options,
}

impl Related<super::exam::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exam.def()
    }
}

impl Related<super::question_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Options.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Outcome of auto-grading a single objective response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoGradeOutcome {
    pub marks_obtained: f64,
    pub is_correct: bool,
}

impl Model {
    pub async fn create<C>(
        db: &C,
        exam_id: i64,
        question_type: QuestionType,
        text: &str,
        marks: f64,
        negative_marks: f64,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        let active_model = ActiveModel {
            exam_id: Set(exam_id),
            question_type: Set(question_type),
            text: Set(text.to_owned()),
            marks: Set(marks),
            negative_marks: Set(negative_marks),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn options<C>(&self, db: &C) -> Result<Vec<super::question_option::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        super::question_option::Entity::find()
            .filter(super::question_option::Column::QuestionId.eq(self.id))
            .all(db)
            .await
    }

    /// Grade an objective answer against the question's options.
    ///
    /// Deterministic and re-entrant: a resubmission is re-evaluated from
    /// scratch. The answer matches the correct option either by its numeric
    /// id or by its text (case-insensitive). Incorrect answers earn the
    /// negative deduction; any floor is applied by aggregation, not here.
    ///
    /// Returns `None` for non-objective questions, which are never
    /// auto-graded.
    pub fn auto_grade(
        &self,
        options: &[super::question_option::Model],
        answer_text: &str,
    ) -> Option<AutoGradeOutcome> {
        if !self.question_type.is_objective() {
            return None;
        }

        let correct = options.iter().find(|o| o.is_correct)?;
        let answer = answer_text.trim();
        let is_correct = answer == correct.id.to_string()
            || answer.eq_ignore_ascii_case(correct.option_text.trim());

        let marks_obtained = if is_correct {
            self.marks
        } else {
            -self.negative_marks
        };

        Some(AutoGradeOutcome {
            marks_obtained,
            is_correct,
        })
    }
}
