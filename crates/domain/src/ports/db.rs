use thiserror::Error;

use super::BoxFuture;
use crate::error::DomainError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("db unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for DomainError {
    fn from(err: DbError) -> Self {
        DomainError::UpstreamUnavailable(err.to_string())
    }
}

/// Backend probe used before wiring repositories to a store.
pub trait DbAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn health_check(&self) -> BoxFuture<'_, Result<(), DbError>>;
}
