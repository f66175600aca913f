pub mod exam_factory;
pub mod user_factory;
