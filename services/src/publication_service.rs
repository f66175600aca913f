use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Serialize;

use db::models::{
    exam,
    exam_publication::{self, PublicationStatus},
    response, result,
};
use db::scoring;

use crate::error::{ServiceError, ServiceResult};
use crate::grading_service::GradingService;
use crate::result_service::{AggregateStamp, ResultService};

/// Snapshot returned by `publish`/`unpublish`.
#[derive(Debug, Serialize)]
pub struct PublicationOutcome {
    pub exam_id: i64,
    pub status: PublicationStatus,
    pub total_students: i64,
    pub graded_students: i64,
    pub results_written: usize,
}

/// Read-only projection of an exam's publication and grading progress.
#[derive(Debug, Serialize)]
pub struct PublicationOverview {
    pub exam_id: i64,
    pub is_published: bool,
    pub total_students: i64,
    pub graded_students: i64,
    pub grading_progress_percent: f64,
}

/// Per-exam state machine gating result visibility:
/// NotPublished -> Published (only once fully graded) -> NotPublished.
pub struct PublicationService;

impl PublicationService {
    /// Publish an exam's results.
    ///
    /// Aggregates every attempting student against one totals snapshot,
    /// marks their results published, then flips the exam's publication
    /// status as the final write of the transaction; a failure mid-way
    /// leaves the exam unpublished.
    pub async fn publish(
        db: &DatabaseConnection,
        exam_id: i64,
        teacher_id: i64,
        passing_percentage: f64,
        notes: Option<String>,
    ) -> ServiceResult<PublicationOutcome> {
        if !(0.0..=100.0).contains(&passing_percentage) {
            return Err(ServiceError::Validation(format!(
                "Passing percentage {} outside [0, 100]",
                passing_percentage
            )));
        }

        let txn = db.begin().await?;

        let exam = exam::Entity::find_by_id(exam_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.created_by != teacher_id {
            return Err(ServiceError::Unauthorized(format!(
                "Teacher {} does not own exam {}",
                teacher_id, exam_id
            )));
        }

        let publication = exam_publication::Model::find_by_exam(&txn, exam_id).await?;
        if publication
            .as_ref()
            .is_some_and(|p| p.status == PublicationStatus::Published)
        {
            return Err(ServiceError::Conflict(format!(
                "Exam {} is already published",
                exam_id
            )));
        }

        let student_ids = response::Model::student_ids_for_exam(&txn, exam_id).await?;
        let ungraded = GradingService::ungraded_student_ids(&txn, exam_id).await?;
        let total_students = student_ids.len() as i64;
        let graded_students = total_students - ungraded.len() as i64;

        if !ungraded.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "Cannot publish exam {}: {} of {} students still have ungraded responses",
                exam_id,
                ungraded.len(),
                total_students
            )));
        }

        // One snapshot for the whole run keeps the ranks mutually
        // consistent across students.
        let exam_total_marks = exam::Model::total_marks(&txn, exam_id).await?;
        let totals = scoring::compute_all_totals(&txn, exam_id).await?;
        let published_at = Utc::now();

        let mut results_written = 0;
        for (student_id, total_marks) in &totals {
            let rank = scoring::rank_within(&totals, *total_marks);
            ResultService::write_aggregate(
                &txn,
                exam_id,
                *student_id,
                *total_marks,
                scoring::percentage(*total_marks, exam_total_marks),
                rank,
                &AggregateStamp {
                    evaluated_by: Some(teacher_id),
                    mark_graded: true,
                    published_at: Some(published_at),
                },
            )
            .await?;
            results_written += 1;
        }

        Self::write_publication(
            &txn,
            publication,
            exam_id,
            PublicationStatus::Published,
            total_students,
            graded_students,
            Some(passing_percentage),
            Some(teacher_id),
            notes,
        )
        .await?;

        txn.commit().await?;
        log::info!(
            "Published exam {}: {} results over {} students",
            exam_id,
            results_written,
            total_students
        );

        Ok(PublicationOutcome {
            exam_id,
            status: PublicationStatus::Published,
            total_students,
            graded_students,
            results_written,
        })
    }

    /// Hide an exam's results again. A visibility toggle only: grading
    /// records and computed result values survive untouched, so the exam
    /// can be regraded and republished.
    pub async fn unpublish(
        db: &DatabaseConnection,
        exam_id: i64,
        teacher_id: i64,
        reason: Option<String>,
    ) -> ServiceResult<PublicationOutcome> {
        let txn = db.begin().await?;

        let exam = exam::Entity::find_by_id(exam_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.created_by != teacher_id {
            return Err(ServiceError::Unauthorized(format!(
                "Teacher {} does not own exam {}",
                teacher_id, exam_id
            )));
        }

        let publication = exam_publication::Model::find_by_exam(&txn, exam_id)
            .await?
            .filter(|p| p.status == PublicationStatus::Published)
            .ok_or_else(|| {
                ServiceError::Conflict(format!("Exam {} is not published", exam_id))
            })?;

        let results = result::Model::find_for_exam(&txn, exam_id).await?;
        let mut hidden = 0;
        for model in results {
            if !model.is_published {
                continue;
            }
            let mut active: result::ActiveModel = model.into();
            active.is_published = Set(false);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await?;
            hidden += 1;
        }

        let total_students = publication.total_students;
        let graded_students = publication.graded_students;

        let mut active: exam_publication::ActiveModel = publication.into();
        active.status = Set(PublicationStatus::NotPublished);
        if let Some(reason) = reason {
            active.notes = Set(Some(reason));
        }
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        txn.commit().await?;
        log::info!("Unpublished exam {}: {} results hidden", exam_id, hidden);

        Ok(PublicationOutcome {
            exam_id,
            status: PublicationStatus::NotPublished,
            total_students,
            graded_students,
            results_written: hidden,
        })
    }

    /// Live grading/publication progress for an exam. Counts are computed
    /// fresh, not read from the last publish.
    pub async fn status_of(
        db: &DatabaseConnection,
        exam_id: i64,
    ) -> ServiceResult<PublicationOverview> {
        if exam::Entity::find_by_id(exam_id).one(db).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Exam {} not found", exam_id)));
        }

        let is_published = exam_publication::Model::is_published(db, exam_id).await?;
        let student_ids = response::Model::student_ids_for_exam(db, exam_id).await?;
        let ungraded = GradingService::ungraded_student_ids(db, exam_id).await?;

        let total_students = student_ids.len() as i64;
        let graded_students = total_students - ungraded.len() as i64;
        let grading_progress_percent =
            scoring::percentage(graded_students as f64, total_students as f64);

        Ok(PublicationOverview {
            exam_id,
            is_published,
            total_students,
            graded_students,
            grading_progress_percent,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_publication<C>(
        db: &C,
        existing: Option<exam_publication::Model>,
        exam_id: i64,
        status: PublicationStatus,
        total_students: i64,
        graded_students: i64,
        passing_percentage: Option<f64>,
        published_by: Option<i64>,
        notes: Option<String>,
    ) -> ServiceResult<exam_publication::Model>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        let written = match existing {
            Some(model) => {
                let mut active: exam_publication::ActiveModel = model.into();
                active.status = Set(status);
                active.total_students = Set(total_students);
                active.graded_students = Set(graded_students);
                active.passing_percentage = Set(passing_percentage);
                active.published_by = Set(published_by);
                active.published_at = Set(Some(now));
                if notes.is_some() {
                    active.notes = Set(notes);
                }
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                let active = exam_publication::ActiveModel {
                    exam_id: Set(exam_id),
                    status: Set(status),
                    total_students: Set(total_students),
                    graded_students: Set(graded_students),
                    passing_percentage: Set(passing_percentage),
                    published_by: Set(published_by),
                    published_at: Set(Some(now)),
                    notes: Set(notes),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(db).await?
            }
        };

        Ok(written)
    }
}
