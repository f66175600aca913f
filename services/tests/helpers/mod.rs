use db::factories::{exam_factory, user_factory};
use db::models::{exam, question, response, user};
use sea_orm::DatabaseConnection;
use services::response_service::ResponseService;

/// The worked example exam: two objective questions worth 5 (no negative
/// marking) and one subjective question worth 10.
pub struct ExamFixture {
    pub teacher: user::Model,
    pub students: Vec<user::Model>,
    pub exam: exam::Model,
    pub objective_a: question::Model,
    pub objective_b: question::Model,
    pub subjective: question::Model,
}

pub async fn exam_fixture(db: &DatabaseConnection, student_count: usize) -> ExamFixture {
    let teacher = user_factory::make(db).await;
    let mut students = Vec::with_capacity(student_count);
    for _ in 0..student_count {
        students.push(user_factory::make(db).await);
    }

    let exam = exam_factory::make_open(db, teacher.id).await;
    let objective_a =
        exam_factory::make_objective_question(db, exam.id, 5.0, 0.0, &["3", "4"], "4").await;
    let objective_b =
        exam_factory::make_objective_question(db, exam.id, 5.0, 0.0, &["Paris", "London"], "Paris")
            .await;
    let subjective =
        exam_factory::make_manual_question(db, exam.id, question::QuestionType::Subjective, 10.0)
            .await;

    ExamFixture {
        teacher,
        students,
        exam,
        objective_a,
        objective_b,
        subjective,
    }
}

/// Submit both objective answers correctly plus subjective text for one
/// student, returning the subjective response for grading.
pub async fn submit_full_attempt(
    db: &DatabaseConnection,
    fixture: &ExamFixture,
    student_id: i64,
) -> response::Model {
    ResponseService::submit(db, fixture.exam.id, fixture.objective_a.id, student_id, "4")
        .await
        .expect("objective A submission failed");
    ResponseService::submit(db, fixture.exam.id, fixture.objective_b.id, student_id, "Paris")
        .await
        .expect("objective B submission failed");
    ResponseService::submit(
        db,
        fixture.exam.id,
        fixture.subjective.id,
        student_id,
        "A considered essay.",
    )
    .await
    .expect("subjective submission failed")
}
