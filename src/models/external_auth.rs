use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExternalAuthProvider {
    Microsoft,
}

impl ExternalAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalAuthProvider::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for ExternalAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// Authorization started, no access token yet.
    Pending,
    Authorized,
}

/// Per (user, provider) token material as kept in the external-auth store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub user_id: Uuid,
    pub provider: ExternalAuthProvider,
    /// Correlation token of the most recent authorization attempt.
    pub state: Option<String>,
    pub requested_scope: Vec<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(with = "time::serde::timestamp::option")]
    pub token_expiration: Option<OffsetDateTime>,
    /// Scope granted by the provider, when it reported one.
    pub scope: Option<Vec<String>>,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl AuthorizationRecord {
    pub fn pending(
        user_id: Uuid,
        provider: ExternalAuthProvider,
        state: String,
        requested_scope: Vec<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user_id,
            provider,
            state: Some(state),
            requested_scope,
            access_token: None,
            refresh_token: None,
            token_expiration: None,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        if self.access_token.is_some() {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Pending
        }
    }

    /// Drops every piece of token material, leaving the record pending.
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.token_expiration = None;
        self.scope = None;
    }

    /// Granted scope when known, otherwise the scope that was asked for.
    pub fn effective_scope(&self) -> Vec<String> {
        self.scope
            .clone()
            .unwrap_or_else(|| self.requested_scope.clone())
    }
}

/// Tokens issued by the provider for a code exchange or a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: OffsetDateTime,
    pub scope: Option<Vec<String>>,
}

impl AuthorizationTokens {
    /// Applies freshly issued tokens. A refresh token is only replaced when
    /// the provider rotated it.
    pub fn apply_to(self, record: &mut AuthorizationRecord) {
        record.access_token = Some(self.access_token);
        if let Some(refresh_token) = self.refresh_token {
            record.refresh_token = Some(refresh_token);
        }
        record.token_expiration = Some(self.expires_at);
        if self.scope.is_some() {
            record.scope = self.scope;
        }
        record.updated_at = OffsetDateTime::now_utc();
    }
}
