use async_trait::async_trait;

use super::{errors::MicrosoftOAuthError, models::ClientCredentials};
use crate::models::external_auth::AuthorizationTokens;

#[async_trait]
pub trait MicrosoftOAuthService: Send + Sync {
    async fn exchange_code_for_token(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError>;

    async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<AuthorizationTokens, MicrosoftOAuthError>;
}
