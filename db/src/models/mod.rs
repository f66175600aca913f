pub mod exam;
pub mod exam_publication;
pub mod grading_record;
pub mod question;
pub mod question_option;
pub mod response;
pub mod result;
pub mod user;

pub use exam::Entity as Exam;
pub use exam_publication::Entity as ExamPublication;
pub use grading_record::Entity as GradingRecord;
pub use question::Entity as Question;
pub use question_option::Entity as QuestionOption;
pub use response::Entity as Response;
pub use result::Entity as Result;
pub use user::Entity as User;
