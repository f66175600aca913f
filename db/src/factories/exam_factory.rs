use chrono::{Duration, Utc};
use sea_orm::ConnectionTrait;

use crate::models::exam::Model as Exam;
use crate::models::question::{Model as Question, QuestionType};
use crate::models::question_option::Model as QuestionOption;

/// Inserts an exam with an open attempt window owned by `teacher_id`.
pub async fn make_open<C: ConnectionTrait>(db: &C, teacher_id: i64) -> Exam {
    let now = Utc::now();
    Exam::create(
        db,
        "Factory Exam",
        teacher_id,
        now - Duration::hours(1),
        now + Duration::hours(1),
    )
    .await
    .expect("Failed to create exam")
}

/// Inserts an exam whose attempt window has already closed.
pub async fn make_closed<C: ConnectionTrait>(db: &C, teacher_id: i64) -> Exam {
    let now = Utc::now();
    Exam::create(
        db,
        "Factory Exam (closed)",
        teacher_id,
        now - Duration::hours(3),
        now - Duration::hours(1),
    )
    .await
    .expect("Failed to create exam")
}

/// Inserts an objective question with the given options; exactly one
/// option text must match `correct`.
pub async fn make_objective_question<C: ConnectionTrait>(
    db: &C,
    exam_id: i64,
    marks: f64,
    negative_marks: f64,
    options: &[&str],
    correct: &str,
) -> Question {
    let question = Question::create(
        db,
        exam_id,
        QuestionType::Objective,
        "Pick the right option",
        marks,
        negative_marks,
    )
    .await
    .expect("Failed to create question");

    for option in options {
        QuestionOption::create(db, question.id, option, *option == correct)
            .await
            .expect("Failed to create option");
    }

    question
}

/// Inserts a manually graded question of the given type.
pub async fn make_manual_question<C: ConnectionTrait>(
    db: &C,
    exam_id: i64,
    question_type: QuestionType,
    marks: f64,
) -> Question {
    Question::create(db, exam_id, question_type, "Discuss.", marks, 0.0)
        .await
        .expect("Failed to create question")
}
