use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    callback::CallbackChannel,
    errors::ExternalAuthError,
    microsoft::{models::ClientCredentials, service::MicrosoftOAuthService},
    pending::PendingAuthorizations,
};
use crate::config::{MicrosoftOAuthSettings, ReauthorizePolicy};
use crate::db::external_auth_repository::ExternalAuthRepository;
use crate::models::external_auth::{AuthorizationRecord, ExternalAuthProvider};
use crate::utils::state_token::generate_state_token;

pub const MAX_SCOPE_ENTRY_LENGTH: usize = 512;

const PROVIDER: ExternalAuthProvider = ExternalAuthProvider::Microsoft;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub state: String,
}

/// Starts authorization-code flows and finishes them in background listeners.
#[derive(Clone)]
pub struct AuthorizationCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    repo: Arc<dyn ExternalAuthRepository>,
    oauth: Arc<dyn MicrosoftOAuthService>,
    callbacks: Arc<dyn CallbackChannel>,
    settings: MicrosoftOAuthSettings,
    pending: Arc<PendingAuthorizations>,
}

impl AuthorizationCoordinator {
    pub fn new(
        repo: Arc<dyn ExternalAuthRepository>,
        oauth: Arc<dyn MicrosoftOAuthService>,
        callbacks: Arc<dyn CallbackChannel>,
        settings: MicrosoftOAuthSettings,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                repo,
                oauth,
                callbacks,
                settings,
                pending: Arc::new(PendingAuthorizations::new()),
            }),
        }
    }

    pub fn pending(&self) -> Arc<PendingAuthorizations> {
        self.inner.pending.clone()
    }

    pub async fn begin_authorization(
        &self,
        user_id: Uuid,
        requested_scope: Option<Vec<String>>,
    ) -> Result<AuthorizationRequest, ExternalAuthError> {
        let scope = self.resolve_scope(requested_scope)?;
        let state = generate_state_token();
        let authorization_url = self.authorization_url(&scope, &state)?;

        let policy = self.inner.settings.reauthorize_policy;
        let merge_state = state.clone();
        let merge_scope = scope.clone();
        self.inner
            .repo
            .upsert_with(
                AuthorizationRecord::pending(user_id, PROVIDER, state.clone(), scope),
                Box::new(move |existing: &mut AuthorizationRecord| {
                    existing.state = Some(merge_state);
                    existing.requested_scope = merge_scope;
                    if policy == ReauthorizePolicy::Replace {
                        existing.clear_tokens();
                    }
                    existing.updated_at = OffsetDateTime::now_utc();
                }),
            )
            .await?;

        self.inner.callbacks.open(&state);
        let cancel = self.inner.pending.register(&state, user_id);
        self.spawn_listener(user_id, state.clone(), cancel);

        info!(%user_id, provider = %PROVIDER, %policy, "authorization started");

        Ok(AuthorizationRequest {
            authorization_url,
            state,
        })
    }

    /// Exchanges `code` and stores the tokens on the user's record.
    pub async fn complete_authorization(
        &self,
        user_id: Uuid,
        state: &str,
        code: &str,
    ) -> Result<AuthorizationRecord, ExternalAuthError> {
        let credentials = ClientCredentials::from_settings(&self.inner.settings);
        let tokens = self
            .inner
            .oauth
            .exchange_code_for_token(&credentials, code)
            .await?;

        let state = state.to_string();
        let record = self
            .inner
            .repo
            .modify(
                user_id,
                PROVIDER,
                Box::new(move |record: &mut AuthorizationRecord| {
                    if record.state.as_deref() == Some(state.as_str()) {
                        record.state = None;
                    }
                    tokens.apply_to(record);
                }),
            )
            .await?;
        Ok(record)
    }

    /// Cancels every listener still waiting for `user_id`.
    pub fn cancel_pending(&self, user_id: Uuid) -> usize {
        self.inner.pending.cancel_for_user(user_id)
    }

    pub fn shutdown(&self) {
        info!(
            pending = self.inner.pending.len(),
            "cancelling pending authorizations"
        );
        self.inner.pending.cancel_all();
    }

    fn resolve_scope(
        &self,
        requested: Option<Vec<String>>,
    ) -> Result<Vec<String>, ExternalAuthError> {
        let scope = match requested {
            Some(scope) if !scope.is_empty() => scope,
            _ => return Ok(self.inner.settings.default_scope.clone()),
        };

        let invalid = scope.iter().any(|entry| {
            let length = entry.chars().count();
            length == 0 || length > MAX_SCOPE_ENTRY_LENGTH
        });
        if invalid {
            return Err(ExternalAuthError::Validation(format!(
                "scope entries must be between 1 and {MAX_SCOPE_ENTRY_LENGTH} characters"
            )));
        }
        Ok(scope)
    }

    fn authorization_url(&self, scope: &[String], state: &str) -> Result<String, ExternalAuthError> {
        let settings = &self.inner.settings;
        let mut url = Url::parse(&settings.authorization_base_url).map_err(|err| {
            ExternalAuthError::Configuration(format!("invalid authorization base url: {err}"))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &settings.client_id)
            .append_pair("redirect_uri", &settings.redirect_uri)
            .append_pair("scope", &scope.join(" "))
            .append_pair("state", state);
        Ok(url.into())
    }

    fn spawn_listener(&self, user_id: Uuid, state: String, cancel: CancellationToken) {
        let coordinator = self.clone();
        let timeout = self.inner.settings.callback_timeout;

        tokio::spawn(async move {
            let callbacks = coordinator.inner.callbacks.clone();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(%user_id, "authorization listener cancelled");
                }
                received = tokio::time::timeout(timeout, callbacks.wait_for_code(&state)) => {
                    match received {
                        Ok(Ok(message)) => {
                            coordinator.finish_authorization(user_id, &state, &message.code).await;
                        }
                        Ok(Err(err)) => {
                            warn!(%user_id, error = %err, "authorization callback failed");
                        }
                        Err(_) => {
                            warn!(%user_id, ?timeout, "authorization callback timed out");
                        }
                    }
                }
            }

            callbacks.close(&state);
            coordinator.inner.pending.finish(&state);
        });
    }

    async fn finish_authorization(&self, user_id: Uuid, state: &str, code: &str) {
        match self.complete_authorization(user_id, state, code).await {
            Ok(_) => info!(%user_id, provider = %PROVIDER, "authorization completed"),
            Err(ExternalAuthError::NotFound) => {
                warn!(%user_id, "authorization record removed before completion; dropping tokens")
            }
            Err(err) => error!(%user_id, error = %err, "authorization completion failed"),
        }
    }
}
