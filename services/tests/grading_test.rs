mod helpers;

use db::models::grading_record::GradingStatus;
use db::test_utils::setup_test_db;
use sea_orm::EntityTrait;
use helpers::{exam_fixture, submit_full_attempt};
use services::ServiceError;
use services::grading_service::{BatchGradeItem, GradingService, PendingScope};
use services::response_service::ResponseService;

#[tokio::test]
async fn grade_single_records_and_mirrors() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let response = submit_full_attempt(&db, &fixture, student).await;

    let record = GradingService::grade_single(
        &db,
        response.id,
        fixture.teacher.id,
        7.0,
        Some("solid reasoning".to_string()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(record.status, GradingStatus::Graded);
    assert_eq!(record.marks_obtained, 7.0);
    assert!(!record.superseded);

    let history = GradingService::history(&db, response.id).await.unwrap();
    assert_eq!(history.len(), 1);

    let mirrored = db::models::response::Model::find_by_triple(
        &db,
        fixture.exam.id,
        fixture.subjective.id,
        student,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(mirrored.marks_obtained, 7.0);
    assert_eq!(mirrored.is_correct, Some(true));
}

#[tokio::test]
async fn grade_single_rejects_out_of_range_marks() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let response = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;

    for marks in [-1.0, 10.5, f64::NAN] {
        let err =
            GradingService::grade_single(&db, response.id, fixture.teacher.id, marks, None, None)
                .await
                .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

#[tokio::test]
async fn grade_single_twice_conflicts() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let response = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;

    GradingService::grade_single(&db, response.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    let err = GradingService::grade_single(&db, response.id, fixture.teacher.id, 8.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn objective_responses_cannot_be_manually_graded() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let student = fixture.students[0].id;

    let objective =
        ResponseService::submit(&db, fixture.exam.id, fixture.objective_a.id, student, "4")
            .await
            .unwrap();

    let err = GradingService::grade_single(&db, objective.id, fixture.teacher.id, 5.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(GradingService::is_graded(&db, objective.id).await.unwrap());
}

#[tokio::test]
async fn regrade_appends_and_never_deletes() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let response = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;

    let first = GradingService::grade_single(&db, response.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    let second = GradingService::regrade(
        &db,
        response.id,
        fixture.teacher.id,
        9.0,
        "recount",
        None,
    )
    .await
    .unwrap();

    assert_eq!(second.status, GradingStatus::Regraded);
    assert_eq!(second.regraded_from, Some(first.id));
    assert_eq!(second.regrade_reason.as_deref(), Some("recount"));

    let history = GradingService::history(&db, response.id).await.unwrap();
    assert_eq!(history.len(), 2);
    // Most recent first.
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[0].marks_obtained, 9.0);
    assert!(!history[0].superseded);
    assert_eq!(history[1].id, first.id);
    assert!(history[1].superseded);

    let mirrored = db::models::response::Entity::find_by_id(response.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mirrored.marks_obtained, 9.0);
}

#[tokio::test]
async fn regrade_requires_a_reason() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let response = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;

    GradingService::grade_single(&db, response.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    let err = GradingService::regrade(&db, response.id, fixture.teacher.id, 9.0, "  ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn regrade_before_any_grade_conflicts() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 1).await;
    let response = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;

    let err = GradingService::regrade(&db, response.id, fixture.teacher.id, 9.0, "recount", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn batch_grade_reports_partial_failure() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 3).await;

    let mut response_ids = Vec::new();
    for student in &fixture.students {
        response_ids.push(submit_full_attempt(&db, &fixture, student.id).await.id);
    }

    let items = vec![
        BatchGradeItem {
            response_id: response_ids[0],
            marks_obtained: 6.0,
            feedback: None,
        },
        BatchGradeItem {
            response_id: response_ids[1],
            marks_obtained: 8.0,
            feedback: Some("good".to_string()),
        },
        // Out of range.
        BatchGradeItem {
            response_id: response_ids[2],
            marks_obtained: 99.0,
            feedback: None,
        },
        // Unknown response.
        BatchGradeItem {
            response_id: 424242,
            marks_obtained: 5.0,
            feedback: None,
        },
    ];

    let outcome = GradingService::batch_grade(
        &db,
        fixture.exam.id,
        fixture.subjective.id,
        fixture.teacher.id,
        items,
    )
    .await
    .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.fail_count, 2);
    assert_eq!(outcome.failures.len(), 2);

    // The failed items are still pending; the graded ones are not.
    assert!(GradingService::is_graded(&db, response_ids[0]).await.unwrap());
    assert!(GradingService::is_graded(&db, response_ids[1]).await.unwrap());
    assert!(!GradingService::is_graded(&db, response_ids[2]).await.unwrap());
}

#[tokio::test]
async fn pending_lists_only_manual_ungraded_responses() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 2).await;
    let [a, b] = [fixture.students[0].id, fixture.students[1].id];

    let pending_a = submit_full_attempt(&db, &fixture, a).await;
    let pending_b = submit_full_attempt(&db, &fixture, b).await;

    let page = GradingService::pending_for(&db, fixture.exam.id, PendingScope::Exam, 1, 50)
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let ids: Vec<i64> = page.responses.iter().map(|r| r.id).collect();
    assert!(ids.contains(&pending_a.id) && ids.contains(&pending_b.id));

    let by_student =
        GradingService::pending_for(&db, fixture.exam.id, PendingScope::Student(a), 1, 50)
            .await
            .unwrap();
    assert_eq!(by_student.total, 1);
    assert_eq!(by_student.responses[0].id, pending_a.id);

    let by_question = GradingService::pending_for(
        &db,
        fixture.exam.id,
        PendingScope::Question(fixture.objective_a.id),
        1,
        50,
    )
    .await
    .unwrap();
    assert_eq!(by_question.total, 0, "objective responses are never pending");

    // Grading empties the pool.
    GradingService::grade_single(&db, pending_a.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();
    let after = GradingService::pending_for(&db, fixture.exam.id, PendingScope::Exam, 1, 50)
        .await
        .unwrap();
    assert_eq!(after.total, 1);
    assert_eq!(after.responses[0].id, pending_b.id);
}

#[tokio::test]
async fn pending_pages_are_stable() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 3).await;
    for student in &fixture.students {
        submit_full_attempt(&db, &fixture, student.id).await;
    }

    let first = GradingService::pending_for(&db, fixture.exam.id, PendingScope::Exam, 1, 2)
        .await
        .unwrap();
    let second = GradingService::pending_for(&db, fixture.exam.id, PendingScope::Exam, 2, 2)
        .await
        .unwrap();

    assert_eq!(first.total, 3);
    assert_eq!(first.responses.len(), 2);
    assert_eq!(second.responses.len(), 1);
    assert!(first.responses.iter().all(|r| r.id != second.responses[0].id));
}

#[tokio::test]
async fn history_for_unknown_response_is_not_found() {
    let db = setup_test_db().await;
    exam_fixture(&db, 1).await;

    let err = GradingService::history(&db, 9999).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn grading_overview_counts_per_question() {
    let db = setup_test_db().await;
    let fixture = exam_fixture(&db, 2).await;
    let graded = submit_full_attempt(&db, &fixture, fixture.students[0].id).await;
    submit_full_attempt(&db, &fixture, fixture.students[1].id).await;
    GradingService::grade_single(&db, graded.id, fixture.teacher.id, 7.0, None, None)
        .await
        .unwrap();

    let overview = GradingService::grading_overview(&db, fixture.exam.id)
        .await
        .unwrap();
    assert_eq!(overview.len(), 3);

    let subjective = overview
        .iter()
        .find(|s| s.question_id == fixture.subjective.id)
        .unwrap();
    assert_eq!(subjective.total_responses, 2);
    assert_eq!(subjective.graded_responses, 1);
    assert_eq!(subjective.pending_responses, 1);

    let objective = overview
        .iter()
        .find(|s| s.question_id == fixture.objective_a.id)
        .unwrap();
    assert_eq!(objective.pending_responses, 0);
    assert_eq!(objective.graded_responses, 2);
}
