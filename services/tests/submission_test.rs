mod helpers;

use db::factories::{exam_factory, user_factory};
use db::models::result::ResultStatus;
use db::test_utils::setup_test_db;
use helpers::{exam_fixture, submit_full_attempt};
use services::ServiceError;
use services::grading_service::GradingService;
use services::publication_service::PublicationService;
use services::response_service::ResponseService;

#[tokio::test]
async fn objective_submission_is_auto_graded() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let response =
        ResponseService::submit(&db, fixture.exam.id, fixture.objective_a.id, student, "4")
            .await
            .unwrap();

    assert_eq!(response.marks_obtained, 5.0);
    assert_eq!(response.is_correct, Some(true));
}

#[tokio::test]
async fn incorrect_objective_answer_earns_negative_marks() {
    let db = setup_test_db().await;
    let teacher = user_factory::make(&db).await;
    let student = user_factory::make(&db).await;
    let exam = exam_factory::make_open(&db, teacher.id).await;
    let question =
        exam_factory::make_objective_question(&db, exam.id, 5.0, 2.0, &["3", "4"], "4").await;

    let response = ResponseService::submit(&db, exam.id, question.id, student.id, "3")
        .await
        .unwrap();

    assert_eq!(response.marks_obtained, -2.0);
    assert_eq!(response.is_correct, Some(false));
}

#[tokio::test]
async fn resubmission_overwrites_and_regrades() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let first = ResponseService::submit(&db, fixture.exam.id, fixture.objective_a.id, student, "3")
        .await
        .unwrap();
    assert_eq!(first.is_correct, Some(false));

    let second =
        ResponseService::submit(&db, fixture.exam.id, fixture.objective_a.id, student, "4")
            .await
            .unwrap();

    assert_eq!(second.id, first.id, "resubmission must reuse the row");
    assert_eq!(second.marks_obtained, 5.0);
    assert_eq!(second.is_correct, Some(true));
}

#[tokio::test]
async fn resubmission_invalidates_a_manual_grade() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let response = ResponseService::submit(
        &db,
        fixture.exam.id,
        fixture.subjective.id,
        student,
        "first draft",
    )
    .await
    .unwrap();
    GradingService::grade_single(&db, response.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    assert!(GradingService::is_graded(&db, response.id).await.unwrap());

    let resubmitted = ResponseService::submit(
        &db,
        fixture.exam.id,
        fixture.subjective.id,
        student,
        "second draft",
    )
    .await
    .unwrap();

    assert!(!GradingService::is_graded(&db, response.id).await.unwrap());
    assert_eq!(resubmitted.marks_obtained, 0.0);
    assert_eq!(resubmitted.is_correct, None);

    // The invalidated decision stays in the audit trail.
    let history = GradingService::history(&db, response.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].superseded);
}

#[tokio::test]
async fn closed_attempt_window_rejects_submission() {
    let db = setup_test_db().await;
    let teacher = user_factory::make(&db).await;
    let student = user_factory::make(&db).await;
    let exam = exam_factory::make_closed(&db, teacher.id).await;
    let question =
        exam_factory::make_objective_question(&db, exam.id, 5.0, 0.0, &["3", "4"], "4").await;

    let err = ResponseService::submit(&db, exam.id, question.id, student.id, "4")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn published_exam_rejects_further_edits() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let subjective = submit_full_attempt(&db, &fixture, student).await;
    GradingService::grade_single(&db, subjective.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    PublicationService::publish(&db, fixture.exam.id, fixture.teacher.id, 50.0, None)
        .await
        .unwrap();

    let err = ResponseService::submit(
        &db,
        fixture.exam.id,
        fixture.subjective.id,
        student,
        "too late",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn unknown_question_is_not_found() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;

    let err = ResponseService::submit(&db, fixture.exam.id, 9999, fixture.students[0].id, "4")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn question_from_another_exam_is_not_found() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let other_exam = exam_factory::make_open(&db, fixture.teacher.id).await;
    let other_question =
        exam_factory::make_objective_question(&db, other_exam.id, 5.0, 0.0, &["3", "4"], "4").await;

    let err = ResponseService::submit(
        &db,
        fixture.exam.id,
        other_question.id,
        fixture.students[0].id,
        "4",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn finalize_creates_completed_result_once() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    submit_full_attempt(&db, &fixture, student).await;

    let result = ResponseService::finalize(&db, fixture.exam.id, student)
        .await
        .unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    // Objective share is already known; subjective is still ungraded.
    assert_eq!(result.total_marks, 10.0);
    assert!(!result.is_published);

    let err = ResponseService::finalize(&db, fixture.exam.id, student)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn finalize_without_responses_is_not_found() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;

    let err = ResponseService::finalize(&db, fixture.exam.id, fixture.students[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
