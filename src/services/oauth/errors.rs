use thiserror::Error;

use super::microsoft::errors::MicrosoftOAuthError;
use crate::db::external_auth_repository::StoreError;
use crate::models::external_auth::ExternalAuthProvider;

#[derive(Debug, Error)]
pub enum ExternalAuthError {
    #[error("{0}")]
    Validation(String),
    #[error("external auth not found")]
    NotFound,
    #[error("This external authentification method has been set but not authorized: \"{0}\"")]
    NotAuthorizedYet(ExternalAuthProvider),
    #[error("Microsoft is unavailable: {0}")]
    UpstreamUnavailable(#[from] MicrosoftOAuthError),
    #[error("external auth storage error: {0}")]
    Storage(String),
    #[error("external auth misconfigured: {0}")]
    Configuration(String),
}

impl From<StoreError> for ExternalAuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ExternalAuthError::NotFound,
            StoreError::Unavailable(reason) => ExternalAuthError::Storage(reason),
        }
    }
}
