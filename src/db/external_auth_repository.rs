use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::external_auth::{AuthorizationRecord, ExternalAuthProvider};

/// In-place mutation applied atomically to a stored record.
pub type RecordUpdate = Box<dyn FnOnce(&mut AuthorizationRecord) + Send>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("external auth record not found")]
    NotFound,
    #[error("external auth store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage for external-auth records, keyed by (user, provider).
///
/// Implementations must apply each call atomically for a single key.
#[async_trait]
pub trait ExternalAuthRepository: Send + Sync {
    async fn find(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
    ) -> Result<Option<AuthorizationRecord>, StoreError>;

    /// Inserts `record` when the key is free, otherwise applies `merge` to the
    /// stored record. Returns the stored value.
    async fn upsert_with(
        &self,
        record: AuthorizationRecord,
        merge: RecordUpdate,
    ) -> Result<AuthorizationRecord, StoreError>;

    /// Applies `update` to an existing record; `StoreError::NotFound` when absent.
    async fn modify(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
        update: RecordUpdate,
    ) -> Result<AuthorizationRecord, StoreError>;

    async fn delete(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
    ) -> Result<(), StoreError>;
}
