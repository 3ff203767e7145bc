use async_trait::async_trait;
use reqwest::Client;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::{
    errors::MicrosoftOAuthError,
    models::{ClientCredentials, TokenResponse},
    service::MicrosoftOAuthService,
};
use crate::config::split_scope;
use crate::models::external_auth::AuthorizationTokens;

#[derive(Clone)]
pub struct MicrosoftOAuthClient {
    pub client: Client,
}

impl MicrosoftOAuthClient {
    async fn request_token(
        &self,
        credentials: &ClientCredentials,
        form: &[(&str, &str)],
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError> {
        debug!(token_url = %credentials.token_url, "requesting Microsoft token");

        let response = self
            .client
            .post(&credentials.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Microsoft token endpoint rejected request");
            return Err(MicrosoftOAuthError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let response: TokenResponse = response
            .json()
            .await
            .map_err(|err| MicrosoftOAuthError::InvalidResponse(err.to_string()))?;

        let expires_in = response.expires_in.ok_or_else(|| {
            MicrosoftOAuthError::InvalidResponse("Microsoft response missing expires_in".into())
        })?;
        let expires_at = expiry_from(OffsetDateTime::now_utc(), expires_in)?;

        Ok(AuthorizationTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
            scope: response.scope.as_deref().map(split_scope),
        })
    }
}

fn expiry_from(now: OffsetDateTime, expires_in: i64) -> Result<OffsetDateTime, MicrosoftOAuthError> {
    if expires_in < 0 {
        return Err(MicrosoftOAuthError::InvalidResponse(format!(
            "negative expires_in: {expires_in}"
        )));
    }
    now.checked_add(Duration::seconds(expires_in)).ok_or_else(|| {
        MicrosoftOAuthError::InvalidResponse(format!("expires_in out of range: {expires_in}"))
    })
}

#[async_trait]
impl MicrosoftOAuthService for MicrosoftOAuthClient {
    async fn exchange_code_for_token(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError> {
        self.request_token(
            credentials,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await
    }

    async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError> {
        self.request_token(
            credentials,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }
}
