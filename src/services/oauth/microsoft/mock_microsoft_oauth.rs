use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use super::{errors::MicrosoftOAuthError, models::ClientCredentials, service::MicrosoftOAuthService};
use crate::models::external_auth::AuthorizationTokens;

/// Issues `tok1`, `tok2`, ... for exchanges and `refreshed-tok1`, ... for refreshes.
pub struct MockMicrosoftOAuth {
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub expires_in: Duration,
    pub granted_scope: Option<Vec<String>>,
    pub fail_exchange: bool,
    pub fail_refresh: bool,
    pub codes: Mutex<Vec<String>>,
    pub refresh_tokens: Mutex<Vec<String>>,
}

impl Default for MockMicrosoftOAuth {
    fn default() -> Self {
        Self {
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            expires_in: Duration::hours(1),
            granted_scope: None,
            fail_exchange: false,
            fail_refresh: false,
            codes: Mutex::new(Vec::new()),
            refresh_tokens: Mutex::new(Vec::new()),
        }
    }
}

impl MockMicrosoftOAuth {
    pub fn exchange_count(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MicrosoftOAuthService for MockMicrosoftOAuth {
    async fn exchange_code_for_token(
        &self,
        _credentials: &ClientCredentials,
        code: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError> {
        let call = self.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.codes.lock().unwrap().push(code.to_string());
        if self.fail_exchange {
            return Err(MicrosoftOAuthError::UnexpectedStatus {
                status: 400,
                body: "invalid_grant".into(),
            });
        }
        Ok(AuthorizationTokens {
            access_token: format!("tok{call}"),
            refresh_token: Some(format!("refresh-{call}")),
            expires_at: OffsetDateTime::now_utc() + self.expires_in,
            scope: self.granted_scope.clone(),
        })
    }

    async fn refresh_access_token(
        &self,
        _credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_tokens
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        if self.fail_refresh {
            return Err(MicrosoftOAuthError::UnexpectedStatus {
                status: 503,
                body: "temporarily_unavailable".into(),
            });
        }
        Ok(AuthorizationTokens {
            access_token: format!("refreshed-tok{call}"),
            refresh_token: None,
            expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
            scope: self.granted_scope.clone(),
        })
    }
}
