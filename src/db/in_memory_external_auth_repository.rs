use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::external_auth_repository::{ExternalAuthRepository, RecordUpdate, StoreError};
use crate::models::external_auth::{AuthorizationRecord, ExternalAuthProvider};

/// Process-local record store. Each key is updated under its shard lock.
#[derive(Default)]
pub struct InMemoryExternalAuthRepository {
    records: DashMap<(Uuid, ExternalAuthProvider), AuthorizationRecord>,
}

impl InMemoryExternalAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ExternalAuthRepository for InMemoryExternalAuthRepository {
    async fn find(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
    ) -> Result<Option<AuthorizationRecord>, StoreError> {
        Ok(self
            .records
            .get(&(user_id, provider))
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_with(
        &self,
        record: AuthorizationRecord,
        merge: RecordUpdate,
    ) -> Result<AuthorizationRecord, StoreError> {
        match self.records.entry((record.user_id, record.provider)) {
            Entry::Occupied(mut occupied) => {
                merge(occupied.get_mut());
                Ok(occupied.get().clone())
            }
            Entry::Vacant(vacant) => Ok(vacant.insert(record).value().clone()),
        }
    }

    async fn modify(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
        update: RecordUpdate,
    ) -> Result<AuthorizationRecord, StoreError> {
        let mut entry = self
            .records
            .get_mut(&(user_id, provider))
            .ok_or(StoreError::NotFound)?;
        update(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn delete(
        &self,
        user_id: Uuid,
        provider: ExternalAuthProvider,
    ) -> Result<(), StoreError> {
        self.records
            .remove(&(user_id, provider))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: Uuid, state: &str) -> AuthorizationRecord {
        AuthorizationRecord::pending(
            user_id,
            ExternalAuthProvider::Microsoft,
            state.into(),
            vec!["Contacts.Read".into()],
        )
    }

    #[tokio::test]
    async fn upsert_inserts_then_merges() {
        let repo = InMemoryExternalAuthRepository::new();
        let user_id = Uuid::new_v4();

        let stored = repo
            .upsert_with(
                record(user_id, "first"),
                Box::new(|_: &mut AuthorizationRecord| unreachable!()),
            )
            .await
            .unwrap();
        assert_eq!(stored.state.as_deref(), Some("first"));

        let merged = repo
            .upsert_with(
                record(user_id, "second"),
                Box::new(|existing: &mut AuthorizationRecord| {
                    existing.state = Some("merged".into())
                }),
            )
            .await
            .unwrap();
        assert_eq!(merged.state.as_deref(), Some("merged"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn modify_missing_record_is_not_found() {
        let repo = InMemoryExternalAuthRepository::new();
        let err = repo
            .modify(
                Uuid::new_v4(),
                ExternalAuthProvider::Microsoft,
                Box::new(|_: &mut AuthorizationRecord| {}),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let repo = InMemoryExternalAuthRepository::new();
        let user_id = Uuid::new_v4();
        repo.upsert_with(
            record(user_id, "s"),
            Box::new(|_: &mut AuthorizationRecord| {}),
        )
        .await
        .unwrap();

        repo.delete(user_id, ExternalAuthProvider::Microsoft)
            .await
            .expect("first delete succeeds");
        let err = repo
            .delete(user_id, ExternalAuthProvider::Microsoft)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
        assert!(repo.is_empty());
    }
}
