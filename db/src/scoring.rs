use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::models::{
    exam,
    response::{Column as ResponseCol, Entity as ResponseEntity},
};

/// Aggregate floor: an exam total never drops below zero, however much
/// negative marking accrued. Individual responses keep their raw
/// (possibly negative) contribution.
const TOTAL_FLOOR: f64 = 0.0;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Exam not found")]
    ExamNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Totals for one student in one exam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentTotals {
    pub total_marks: f64,
    pub exam_total_marks: f64,
    pub percentage: f64,
}

/// Helper to compute percentage safely.
pub fn percentage(earned: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        (earned * 100.0) / total
    }
}

fn floor_total(raw: f64) -> f64 {
    raw.max(TOTAL_FLOOR)
}

/// Sum of `marks_obtained` across one student's responses for the exam,
/// floored, with the percentage against the exam's total marks.
pub async fn compute_totals<C>(
    db: &C,
    exam_id: i64,
    student_id: i64,
) -> Result<StudentTotals, ScoringError>
where
    C: ConnectionTrait,
{
    let exam_exists = exam::Entity::find_by_id(exam_id).one(db).await?.is_some();
    if !exam_exists {
        return Err(ScoringError::ExamNotFound);
    }

    let exam_total_marks = exam::Model::total_marks(db, exam_id).await?;

    let responses = ResponseEntity::find()
        .filter(ResponseCol::ExamId.eq(exam_id))
        .filter(ResponseCol::StudentId.eq(student_id))
        .all(db)
        .await?;

    let total_marks = floor_total(responses.iter().map(|r| r.marks_obtained).sum());

    Ok(StudentTotals {
        total_marks,
        exam_total_marks,
        percentage: percentage(total_marks, exam_total_marks),
    })
}

/// Floored totals for every student who submitted anything for the exam,
/// read in a single query so ranks derived from it are mutually consistent.
/// Ordered by student id for stable output.
pub async fn compute_all_totals<C>(
    db: &C,
    exam_id: i64,
) -> Result<Vec<(i64, f64)>, ScoringError>
where
    C: ConnectionTrait,
{
    let rows = ResponseEntity::find()
        .filter(ResponseCol::ExamId.eq(exam_id))
        .all(db)
        .await?;

    let mut per_student: HashMap<i64, f64> = HashMap::new();
    for row in rows {
        *per_student.entry(row.student_id).or_insert(0.0) += row.marks_obtained;
    }

    let mut totals: Vec<(i64, f64)> = per_student
        .into_iter()
        .map(|(student_id, raw)| (student_id, floor_total(raw)))
        .collect();
    totals.sort_by_key(|(student_id, _)| *student_id);

    tracing::debug!(
        "Computed totals for exam {}: {} students",
        exam_id,
        totals.len()
    );

    Ok(totals)
}

/// Standard competition rank within a totals snapshot: 1 + the number of
/// students whose total strictly exceeds `total_marks`. Ties share a rank.
pub fn rank_within(totals: &[(i64, f64)], total_marks: f64) -> i64 {
    1 + totals.iter().filter(|(_, t)| *t > total_marks).count() as i64
}

/// Rank for one student's total against a fresh snapshot of the exam.
/// Callers needing ranks for many students at once should take one
/// `compute_all_totals` snapshot and use `rank_within` against it.
pub async fn compute_rank<C>(
    db: &C,
    exam_id: i64,
    total_marks: f64,
) -> Result<i64, ScoringError>
where
    C: ConnectionTrait,
{
    let totals = compute_all_totals(db, exam_id).await?;
    Ok(rank_within(&totals, total_marks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_guards_against_zero_total() {
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert_eq!(percentage(10.0, -1.0), 0.0);
        assert_eq!(percentage(17.0, 20.0), 85.0);
    }

    #[test]
    fn rank_is_one_plus_strictly_better_students() {
        let totals = vec![(1, 15.0), (2, 10.0), (3, 15.0), (4, 7.0)];

        assert_eq!(rank_within(&totals, 15.0), 1);
        assert_eq!(rank_within(&totals, 10.0), 3);
        assert_eq!(rank_within(&totals, 7.0), 4);
    }

    #[test]
    fn tied_students_share_a_rank() {
        let totals = vec![(1, 15.0), (2, 15.0), (3, 10.0)];

        assert_eq!(rank_within(&totals, 15.0), 1);
        assert_eq!(rank_within(&totals, 10.0), 3);
    }

    #[test]
    fn floor_applies_to_totals_not_contributions() {
        assert_eq!(floor_total(-3.0), 0.0);
        assert_eq!(floor_total(3.0), 3.0);
    }

    #[tokio::test]
    async fn compute_totals_for_unknown_exam_fails() {
        let db = crate::test_utils::setup_test_db().await;

        let err = compute_totals(&db, 9999, 1).await.unwrap_err();
        assert!(matches!(err, ScoringError::ExamNotFound));
    }

    #[tokio::test]
    async fn student_without_responses_totals_zero() {
        let db = crate::test_utils::setup_test_db().await;
        let teacher = crate::factories::user_factory::make(&db).await;
        let student = crate::factories::user_factory::make(&db).await;
        let exam = crate::factories::exam_factory::make_open(&db, teacher.id).await;
        crate::factories::exam_factory::make_manual_question(
            &db,
            exam.id,
            crate::models::question::QuestionType::Subjective,
            10.0,
        )
        .await;

        let totals = compute_totals(&db, exam.id, student.id).await.unwrap();
        assert_eq!(totals.total_marks, 0.0);
        assert_eq!(totals.exam_total_marks, 10.0);
        assert_eq!(totals.percentage, 0.0);

        assert!(compute_all_totals(&db, exam.id).await.unwrap().is_empty());
    }
}
