pub mod catalog;
pub mod completion;
pub mod error;
pub mod integrity;
pub mod ports;
pub mod prerequisites;
pub mod progress;
pub mod progression;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
