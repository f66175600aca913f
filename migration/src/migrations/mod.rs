pub mod m202608010001_create_users;
pub mod m202608010002_create_exams;
pub mod m202608010003_create_questions;
pub mod m202608010004_create_responses;
pub mod m202608010005_create_grading_records;
pub mod m202608010006_create_results;
pub mod m202608010007_create_exam_publications;
