use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    errors::ExternalAuthError,
    microsoft::{
        errors::MicrosoftOAuthError, models::ClientCredentials, service::MicrosoftOAuthService,
    },
    pending::PendingAuthorizations,
};
use crate::config::MicrosoftOAuthSettings;
use crate::db::external_auth_repository::ExternalAuthRepository;
use crate::models::external_auth::{AuthorizationRecord, ExternalAuthProvider};

/// Tokens expiring within this window are refreshed before being handed out.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(30);

const PROVIDER: ExternalAuthProvider = ExternalAuthProvider::Microsoft;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessTokenGrant {
    pub access_token: String,
    #[serde(with = "time::serde::timestamp")]
    pub expiration: OffsetDateTime,
    pub scope: Vec<String>,
}

pub fn is_expired(expiration: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match expiration {
        Some(expiration) => now + EXPIRY_MARGIN > expiration,
        None => true,
    }
}

/// Hands out stored access tokens, refreshing them when they are about to expire.
#[derive(Clone)]
pub struct TokenLifecycleService {
    repo: Arc<dyn ExternalAuthRepository>,
    oauth: Arc<dyn MicrosoftOAuthService>,
    settings: MicrosoftOAuthSettings,
    pending: Arc<PendingAuthorizations>,
}

impl TokenLifecycleService {
    pub fn new(
        repo: Arc<dyn ExternalAuthRepository>,
        oauth: Arc<dyn MicrosoftOAuthService>,
        settings: MicrosoftOAuthSettings,
        pending: Arc<PendingAuthorizations>,
    ) -> Self {
        Self {
            repo,
            oauth,
            settings,
            pending,
        }
    }

    pub async fn get_access_token(
        &self,
        user_id: Uuid,
    ) -> Result<AccessTokenGrant, ExternalAuthError> {
        let record = self
            .repo
            .find(user_id, PROVIDER)
            .await?
            .ok_or(ExternalAuthError::NotFound)?;

        if record.access_token.is_none() {
            return Err(ExternalAuthError::NotAuthorizedYet(PROVIDER));
        }

        if !is_expired(record.token_expiration, OffsetDateTime::now_utc()) {
            return grant_from(&record);
        }

        debug!(%user_id, "access token expired, refreshing");
        let refreshed = self.refresh(user_id, &record).await?;
        grant_from(&refreshed)
    }

    /// Drops the user's authorization. Listeners still waiting for a callback
    /// are cancelled first so they cannot write tokens back afterwards.
    pub async fn revoke(&self, user_id: Uuid) -> Result<(), ExternalAuthError> {
        let cancelled = self.pending.cancel_for_user(user_id);
        self.repo.delete(user_id, PROVIDER).await?;
        info!(%user_id, provider = %PROVIDER, cancelled, "authorization revoked");
        Ok(())
    }

    async fn refresh(
        &self,
        user_id: Uuid,
        record: &AuthorizationRecord,
    ) -> Result<AuthorizationRecord, ExternalAuthError> {
        let refresh_token = record
            .refresh_token
            .as_deref()
            .ok_or(MicrosoftOAuthError::MissingRefreshToken)?;

        let credentials = ClientCredentials::from_settings(&self.settings);
        let tokens = self
            .oauth
            .refresh_access_token(&credentials, refresh_token)
            .await
            .map_err(|err| {
                warn!(%user_id, error = %err, "token refresh failed");
                err
            })?;

        let updated = self
            .repo
            .modify(
                user_id,
                PROVIDER,
                Box::new(move |record: &mut AuthorizationRecord| tokens.apply_to(record)),
            )
            .await?;
        info!(%user_id, provider = %PROVIDER, "access token refreshed");
        Ok(updated)
    }
}

fn grant_from(record: &AuthorizationRecord) -> Result<AccessTokenGrant, ExternalAuthError> {
    match (&record.access_token, record.token_expiration) {
        (Some(access_token), Some(expiration)) => Ok(AccessTokenGrant {
            access_token: access_token.clone(),
            expiration,
            scope: record.effective_scope(),
        }),
        _ => Err(ExternalAuthError::NotAuthorizedYet(record.provider)),
    }
}
