use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use super::errors::DirectoryError;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

fn default_port() -> u16 {
    9497
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    "/0.1".to_string()
}

/// Where to reach the authentication service holding the Microsoft tokens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthClientConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
    #[serde(default = "default_true")]
    pub https: bool,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl AuthClientConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() || prefix.starts_with('/') {
            format!("{scheme}://{}:{}{prefix}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}/{prefix}", self.host, self.port)
        }
    }
}

#[derive(Deserialize)]
struct ExternalTokenResponse {
    access_token: Option<String>,
}

/// Reads a user's Microsoft access token through the auth service's
/// external-auth endpoint, authenticated with the caller's session token.
#[derive(Clone)]
pub struct ExternalAuthClient {
    client: Client,
    base_url: String,
}

impl ExternalAuthClient {
    pub fn new(config: &AuthClientConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_certificate)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    pub async fn get_microsoft_access_token(
        &self,
        user_uuid: Uuid,
        session_token: &str,
    ) -> Result<String, DirectoryError> {
        let url = format!("{}/users/{user_uuid}/external/microsoft", self.base_url);
        debug!(%url, "fetching Microsoft token from auth service");

        let response = self
            .client
            .get(&url)
            .header(AUTH_TOKEN_HEADER, session_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                error!(%url, error = %err, "unable to reach auth service");
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                %user_uuid,
                status = status.as_u16(),
                "Microsoft token could not be fetched from auth service"
            );
            return Err(DirectoryError::UnexpectedStatus {
                service: "auth service",
                status: status.as_u16(),
            });
        }

        let body: ExternalTokenResponse = response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
        body.access_token
            .ok_or_else(|| DirectoryError::InvalidResponse("missing access_token".into()))
    }
}
