use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};

use db::models::{
    exam, exam_publication, grading_record, question, response,
    result::{self, ResultStatus},
};
use db::scoring;

use crate::error::{ServiceError, ServiceResult};

/// Owns the set of submitted answers: at most one response per
/// (exam, question, student), resubmission overwrites.
pub struct ResponseService;

impl ResponseService {
    /// Submit or resubmit an answer.
    ///
    /// Rejected with `Conflict` once the exam's results are published or
    /// its attempt window is closed. Objective questions are auto-graded
    /// synchronously. A resubmission over a manually graded answer
    /// supersedes the standing grading record and returns the response to
    /// the pending pool; a stale grade never survives an answer change.
    pub async fn submit(
        db: &DatabaseConnection,
        exam_id: i64,
        question_id: i64,
        student_id: i64,
        answer_text: &str,
    ) -> ServiceResult<response::Model> {
        let txn = db.begin().await?;

        let question = question::Entity::find_by_id(question_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Question {} not found", question_id)))?;
        if question.exam_id != exam_id {
            return Err(ServiceError::NotFound(format!(
                "Question {} does not belong to exam {}",
                question_id, exam_id
            )));
        }

        let exam = exam::Entity::find_by_id(exam_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Exam {} not found", exam_id)))?;

        if exam_publication::Model::is_published(&txn, exam_id).await? {
            return Err(ServiceError::Conflict(
                "Exam results are published; responses can no longer be edited".to_string(),
            ));
        }
        if !exam.is_open(Utc::now()) {
            return Err(ServiceError::Conflict(
                "Exam attempt window is closed".to_string(),
            ));
        }

        let now = Utc::now();
        let existing =
            response::Model::find_by_triple(&txn, exam_id, question_id, student_id).await?;

        let mut saved = match existing {
            Some(existing) => {
                // Resubmission invalidates any standing manual grade.
                grading_record::Model::supersede_current(&txn, existing.id).await?;

                let mut active: response::ActiveModel = existing.into();
                active.answer_text = Set(answer_text.to_owned());
                active.marks_obtained = Set(0.0);
                active.is_correct = Set(None);
                active.submitted_at = Set(now);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                let active = response::ActiveModel {
                    exam_id: Set(exam_id),
                    question_id: Set(question_id),
                    student_id: Set(student_id),
                    answer_text: Set(answer_text.to_owned()),
                    marks_obtained: Set(0.0),
                    is_correct: Set(None),
                    submitted_at: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(&txn).await?
            }
        };

        saved = Self::auto_grade(&txn, &question, saved).await?;

        txn.commit().await?;
        Ok(saved)
    }

    /// Mark the student's attempt complete, creating their result row with
    /// provisional totals. `Conflict` on a second finalization.
    pub async fn finalize(
        db: &DatabaseConnection,
        exam_id: i64,
        student_id: i64,
    ) -> ServiceResult<result::Model> {
        let txn = db.begin().await?;

        let responses = response::Model::find_for_student(&txn, exam_id, student_id).await?;
        if responses.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Student {} has no responses for exam {}",
                student_id, exam_id
            )));
        }

        if result::Model::find_by_exam_and_student(&txn, exam_id, student_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "Attempt has already been finalized".to_string(),
            ));
        }

        let totals = scoring::compute_totals(&txn, exam_id, student_id).await?;
        let created = result::Model::create(
            &txn,
            exam_id,
            student_id,
            totals.total_marks,
            totals.percentage,
            ResultStatus::Completed,
        )
        .await?;

        txn.commit().await?;
        Ok(created)
    }

    async fn auto_grade<C>(
        db: &C,
        question: &question::Model,
        saved: response::Model,
    ) -> ServiceResult<response::Model>
    where
        C: ConnectionTrait,
    {
        if !question.question_type.is_objective() {
            return Ok(saved);
        }

        let options = question.options(db).await?;
        match question.auto_grade(&options, &saved.answer_text) {
            Some(outcome) => Ok(response::Model::set_grade(
                db,
                saved,
                outcome.marks_obtained,
                Some(outcome.is_correct),
            )
            .await?),
            None => Ok(saved),
        }
    }
}
