use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait, TransactionTrait,
};
use serde::Serialize;

use db::models::{
    grading_record::{self, GradingStatus, NewGradingRecord},
    question::{self, QuestionType},
    response,
};

use crate::error::{ServiceError, ServiceResult};

/// Which slice of an exam's ungraded responses to list.
#[derive(Debug, Clone, Copy)]
pub enum PendingScope {
    /// Every ungraded response in the exam.
    Exam,
    /// Ungraded responses for one question.
    Question(i64),
    /// Ungraded responses for one student.
    Student(i64),
}

/// One item of a `batch_grade` call.
#[derive(Debug, Clone)]
pub struct BatchGradeItem {
    pub response_id: i64,
    pub marks_obtained: f64,
    pub feedback: Option<String>,
}

/// Best-effort outcome of a batch: per-item failures are collected, never
/// fatal to the rest of the batch.
#[derive(Debug, Serialize)]
pub struct BatchGradeOutcome {
    pub success_count: usize,
    pub fail_count: usize,
    pub failures: Vec<BatchGradeFailure>,
}

#[derive(Debug, Serialize)]
pub struct BatchGradeFailure {
    pub response_id: i64,
    pub error: String,
}

/// One page of ungraded responses.
#[derive(Debug, Serialize)]
pub struct PendingPage {
    pub responses: Vec<response::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Per-question grading progress for the teacher's dashboard.
#[derive(Debug, Serialize)]
pub struct QuestionGradingSummary {
    pub question_id: i64,
    pub question_type: QuestionType,
    pub total_responses: u64,
    pub graded_responses: u64,
    pub pending_responses: u64,
}

/// Append-only ledger of manual grading decisions.
pub struct GradingService;

impl GradingService {
    /// Record the first grading decision for a response.
    ///
    /// Fails with `Conflict` if a decision already stands — `regrade` is
    /// the only way to change a grade, so every change is audited.
    /// Objective responses are auto-graded and never accept manual marks.
    pub async fn grade_single(
        db: &DatabaseConnection,
        response_id: i64,
        teacher_id: i64,
        marks_obtained: f64,
        feedback: Option<String>,
        comment: Option<String>,
    ) -> ServiceResult<grading_record::Model> {
        let txn = db.begin().await?;

        let (response, question) = Self::load_gradable(&txn, response_id).await?;
        Self::check_marks_range(marks_obtained, &question)?;

        if grading_record::Model::current_for(&txn, response_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Response {} is already graded; use regrade",
                response_id
            )));
        }

        let record = grading_record::Model::append(
            &txn,
            NewGradingRecord {
                response_id,
                teacher_id,
                marks_obtained,
                feedback,
                comment,
                status: GradingStatus::Graded,
                regraded_from: None,
                regrade_reason: None,
            },
        )
        .await?;

        response::Model::set_grade(&txn, response, marks_obtained, Some(marks_obtained > 0.0))
            .await?;

        txn.commit().await?;
        Ok(record)
    }

    /// Supersede the standing decision with a new one. Requires a reason;
    /// the prior record is kept as history, never deleted.
    pub async fn regrade(
        db: &DatabaseConnection,
        response_id: i64,
        teacher_id: i64,
        new_marks: f64,
        reason: &str,
        new_feedback: Option<String>,
    ) -> ServiceResult<grading_record::Model> {
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation(
                "A regrade requires a non-empty reason".to_string(),
            ));
        }

        let txn = db.begin().await?;

        let (response, question) = Self::load_gradable(&txn, response_id).await?;
        Self::check_marks_range(new_marks, &question)?;

        let prior = grading_record::Model::supersede_current(&txn, response_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "Response {} has no standing grade to regrade",
                    response_id
                ))
            })?;

        let record = grading_record::Model::append(
            &txn,
            NewGradingRecord {
                response_id,
                teacher_id,
                marks_obtained: new_marks,
                feedback: new_feedback,
                comment: None,
                status: GradingStatus::Regraded,
                regraded_from: Some(prior.id),
                regrade_reason: Some(reason.trim().to_string()),
            },
        )
        .await?;

        response::Model::set_grade(&txn, response, new_marks, Some(new_marks > 0.0)).await?;

        txn.commit().await?;
        Ok(record)
    }

    /// Grade many responses of one question, best effort: each item runs
    /// in its own transaction and a failing item never aborts the rest.
    pub async fn batch_grade(
        db: &DatabaseConnection,
        exam_id: i64,
        question_id: i64,
        teacher_id: i64,
        items: Vec<BatchGradeItem>,
    ) -> ServiceResult<BatchGradeOutcome> {
        let question = question::Entity::find_by_id(question_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Question {} not found", question_id)))?;
        if question.exam_id != exam_id {
            return Err(ServiceError::NotFound(format!(
                "Question {} does not belong to exam {}",
                question_id, exam_id
            )));
        }

        let mut outcome = BatchGradeOutcome {
            success_count: 0,
            fail_count: 0,
            failures: Vec::new(),
        };

        for item in items {
            let result = Self::grade_batch_item(db, question_id, teacher_id, &item).await;
            match result {
                Ok(()) => outcome.success_count += 1,
                Err(err) => {
                    outcome.fail_count += 1;
                    outcome.failures.push(BatchGradeFailure {
                        response_id: item.response_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Batch graded question {}: {} ok, {} failed",
            question_id,
            outcome.success_count,
            outcome.fail_count
        );
        Ok(outcome)
    }

    async fn grade_batch_item(
        db: &DatabaseConnection,
        question_id: i64,
        teacher_id: i64,
        item: &BatchGradeItem,
    ) -> ServiceResult<()> {
        let response = response::Entity::find_by_id(item.response_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Response {} not found", item.response_id))
            })?;
        if response.question_id != question_id {
            return Err(ServiceError::NotFound(format!(
                "Response {} does not belong to question {}",
                item.response_id, question_id
            )));
        }

        Self::grade_single(
            db,
            item.response_id,
            teacher_id,
            item.marks_obtained,
            item.feedback.clone(),
            None,
        )
        .await?;
        Ok(())
    }

    /// Responses still awaiting a manual grade, paged. Objective responses
    /// are auto-graded at submission and never appear here.
    pub async fn pending_for(
        db: &DatabaseConnection,
        exam_id: i64,
        scope: PendingScope,
        page: u64,
        per_page: u64,
    ) -> ServiceResult<PendingPage> {
        let graded_subq = grading_record::Entity::find()
            .select_only()
            .column(grading_record::Column::ResponseId)
            .filter(grading_record::Column::Superseded.eq(false));

        let mut query = response::Entity::find()
            .filter(response::Column::ExamId.eq(exam_id))
            .join(JoinType::InnerJoin, response::Relation::Question.def())
            .filter(question::Column::QuestionType.ne(QuestionType::Objective))
            .filter(response::Column::Id.not_in_subquery(graded_subq.as_query().to_owned()))
            .order_by_asc(response::Column::Id);

        match scope {
            PendingScope::Exam => {}
            PendingScope::Question(question_id) => {
                query = query.filter(response::Column::QuestionId.eq(question_id));
            }
            PendingScope::Student(student_id) => {
                query = query.filter(response::Column::StudentId.eq(student_id));
            }
        }

        let per_page = per_page.max(1);
        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let responses = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(PendingPage {
            responses,
            total,
            page: page.max(1),
            per_page,
        })
    }

    /// Whether a response currently has a grade: auto for objective
    /// questions, a standing ledger record otherwise.
    pub async fn is_graded(db: &DatabaseConnection, response_id: i64) -> ServiceResult<bool> {
        let (_, question) = Self::load_response(db, response_id).await?;

        if question.question_type.is_objective() {
            return Ok(true);
        }

        Ok(grading_record::Model::current_for(db, response_id)
            .await?
            .is_some())
    }

    /// Full grading audit trail for a response, most recent first.
    pub async fn history(
        db: &DatabaseConnection,
        response_id: i64,
    ) -> ServiceResult<Vec<grading_record::Model>> {
        if response::Entity::find_by_id(response_id).one(db).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Response {} not found",
                response_id
            )));
        }

        Ok(grading_record::Model::history_for(db, response_id).await?)
    }

    /// Per-question pending/graded counts across an exam.
    pub async fn grading_overview(
        db: &DatabaseConnection,
        exam_id: i64,
    ) -> ServiceResult<Vec<QuestionGradingSummary>> {
        let questions = question::Entity::find()
            .filter(question::Column::ExamId.eq(exam_id))
            .order_by_asc(question::Column::Id)
            .all(db)
            .await?;

        let mut summaries = Vec::with_capacity(questions.len());
        for question in questions {
            let total = response::Entity::find()
                .filter(response::Column::QuestionId.eq(question.id))
                .count(db)
                .await?;

            let pending = if question.question_type.is_objective() {
                0
            } else {
                Self::pending_for(db, exam_id, PendingScope::Question(question.id), 1, 1)
                    .await?
                    .total
            };

            summaries.push(QuestionGradingSummary {
                question_id: question.id,
                question_type: question.question_type,
                total_responses: total,
                graded_responses: total - pending,
                pending_responses: pending,
            });
        }

        Ok(summaries)
    }

    /// Distinct students with at least one response still awaiting a grade.
    pub(crate) async fn ungraded_student_ids<C>(db: &C, exam_id: i64) -> ServiceResult<Vec<i64>>
    where
        C: ConnectionTrait,
    {
        let graded_subq = grading_record::Entity::find()
            .select_only()
            .column(grading_record::Column::ResponseId)
            .filter(grading_record::Column::Superseded.eq(false));

        let pending = response::Entity::find()
            .filter(response::Column::ExamId.eq(exam_id))
            .join(JoinType::InnerJoin, response::Relation::Question.def())
            .filter(question::Column::QuestionType.ne(QuestionType::Objective))
            .filter(response::Column::Id.not_in_subquery(graded_subq.as_query().to_owned()))
            .all(db)
            .await?;

        let mut ids: Vec<i64> = pending.into_iter().map(|r| r.student_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn load_gradable<C>(
        db: &C,
        response_id: i64,
    ) -> ServiceResult<(response::Model, question::Model)>
    where
        C: ConnectionTrait,
    {
        let (response, question) = Self::load_response(db, response_id).await?;

        if question.question_type.is_objective() {
            return Err(ServiceError::Conflict(format!(
                "Response {} is for an objective question and is graded automatically",
                response_id
            )));
        }

        Ok((response, question))
    }

    async fn load_response<C>(
        db: &C,
        response_id: i64,
    ) -> ServiceResult<(response::Model, question::Model)>
    where
        C: ConnectionTrait,
    {
        let response = response::Entity::find_by_id(response_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Response {} not found", response_id))
            })?;

        let question = question::Entity::find_by_id(response.question_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Question {} not found", response.question_id))
            })?;

        Ok((response, question))
    }

    fn check_marks_range(marks: f64, question: &question::Model) -> ServiceResult<()> {
        if !marks.is_finite() || marks < 0.0 || marks > question.marks {
            return Err(ServiceError::Validation(format!(
                "Marks {} outside the allowed range [0, {}]",
                marks, question.marks
            )));
        }
        Ok(())
    }
}
