pub mod error;
pub mod grading_service;
pub mod publication_service;
pub mod response_service;
pub mod result_service;

pub use error::ServiceError;
