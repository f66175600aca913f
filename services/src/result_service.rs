use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;

use db::models::{
    exam_publication::{self, PublicationStatus},
    result::{self, ResultStatus},
};
use db::scoring;

use crate::error::{ServiceError, ServiceResult};

/// A published result as shown to the student, with the pass/fail verdict
/// derived from the publication's passing threshold.
#[derive(Debug, Serialize)]
pub struct PublishedResult {
    pub result: result::Model,
    pub passed: Option<bool>,
}

/// Fields an aggregate write stamps onto a result row.
pub(crate) struct AggregateStamp {
    pub evaluated_by: Option<i64>,
    pub mark_graded: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// Computes per-student totals and ranks and materializes them as result
/// rows. Publication visibility is owned by the publication service.
pub struct ResultService;

impl ResultService {
    /// Recompute one student's totals and rank and write them back.
    /// Keeps the row's status and visibility; safe to call while grading
    /// is still in progress.
    pub async fn upsert_result(
        db: &DatabaseConnection,
        exam_id: i64,
        student_id: i64,
    ) -> ServiceResult<result::Model> {
        let txn = db.begin().await?;

        let totals = scoring::compute_totals(&txn, exam_id, student_id).await?;
        let rank = scoring::compute_rank(&txn, exam_id, totals.total_marks).await?;

        let written = Self::write_aggregate(
            &txn,
            exam_id,
            student_id,
            totals.total_marks,
            totals.percentage,
            rank,
            &AggregateStamp {
                evaluated_by: None,
                mark_graded: false,
                published_at: None,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(written)
    }

    /// The student-facing read. `NotFound` until the exam's results are
    /// published; publication state gates visibility here, not in the
    /// transport layer.
    pub async fn result_for_student(
        db: &DatabaseConnection,
        exam_id: i64,
        student_id: i64,
    ) -> ServiceResult<PublishedResult> {
        let publication = exam_publication::Model::find_by_exam(db, exam_id)
            .await?
            .filter(|p| p.status == PublicationStatus::Published)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No published results for exam {}", exam_id))
            })?;

        let result = result::Model::find_by_exam_and_student(db, exam_id, student_id)
            .await?
            .filter(|r| r.is_published)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No published result for student {} in exam {}",
                    student_id, exam_id
                ))
            })?;

        let passed = publication
            .passing_percentage
            .map(|threshold| result.percentage >= threshold);

        Ok(PublishedResult { result, passed })
    }

    /// Teacher-facing listing for an exam, best totals first, regardless
    /// of publication state.
    pub async fn results_for_exam(
        db: &DatabaseConnection,
        exam_id: i64,
    ) -> ServiceResult<Vec<result::Model>> {
        Ok(result::Model::find_for_exam(db, exam_id).await?)
    }

    /// Write totals/rank onto the (exam, student) result row, creating it
    /// if the student never finalized. Runs on the caller's connection so
    /// publication can batch every student into one transaction.
    pub(crate) async fn write_aggregate<C>(
        db: &C,
        exam_id: i64,
        student_id: i64,
        total_marks: f64,
        percentage: f64,
        rank: i64,
        stamp: &AggregateStamp,
    ) -> ServiceResult<result::Model>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        let existing = result::Model::find_by_exam_and_student(db, exam_id, student_id).await?;
        let is_update = existing.is_some();

        let mut active: result::ActiveModel = match existing {
            Some(model) => model.into(),
            None => result::ActiveModel {
                exam_id: Set(exam_id),
                student_id: Set(student_id),
                status: Set(ResultStatus::Pending),
                is_published: Set(false),
                created_at: Set(now),
                ..Default::default()
            },
        };

        active.total_marks = Set(total_marks);
        active.percentage = Set(percentage);
        active.rank = Set(Some(rank));
        active.updated_at = Set(now);

        if stamp.mark_graded {
            active.status = Set(ResultStatus::Graded);
            active.evaluated_by = Set(stamp.evaluated_by);
            active.evaluated_at = Set(Some(now));
        }
        if let Some(published_at) = stamp.published_at {
            active.is_published = Set(true);
            active.published_at = Set(Some(published_at));
        }

        let written = if is_update {
            active.update(db).await?
        } else {
            active.insert(db).await?
        };
        Ok(written)
    }
}
