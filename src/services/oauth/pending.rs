use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct PendingAuthorization {
    user_id: Uuid,
    cancel: CancellationToken,
}

/// Live authorization listeners keyed by their `state` token.
///
/// Every listener gets a child of the root token, so `cancel_all` reaches
/// attempts that are registered later as well.
#[derive(Default)]
pub struct PendingAuthorizations {
    attempts: DashMap<String, PendingAuthorization>,
    root: CancellationToken,
}

impl PendingAuthorizations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, state: &str, user_id: Uuid) -> CancellationToken {
        let cancel = self.root.child_token();
        self.attempts.insert(
            state.to_string(),
            PendingAuthorization {
                user_id,
                cancel: cancel.clone(),
            },
        );
        cancel
    }

    pub fn finish(&self, state: &str) {
        self.attempts.remove(state);
    }

    /// Cancels every listener started for `user_id`; returns how many.
    pub fn cancel_for_user(&self, user_id: Uuid) -> usize {
        let tokens: Vec<CancellationToken> = self
            .attempts
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.cancel.clone())
            .collect();
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }

    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    pub fn contains(&self, state: &str) -> bool {
        self.attempts.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
