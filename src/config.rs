use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::utils::jwt::{JwtKeys, JwtSecretError};

pub const DEFAULT_AUTHORIZATION_BASE_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const DEFAULT_SCOPE: &str = "offline_access Contacts.Read";
pub const DEFAULT_CALLBACK_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(transparent)]
    JwtSecret(#[from] JwtSecretError),
}

/// What happens to existing tokens when a user starts a new authorization
/// while already authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReauthorizePolicy {
    /// Existing tokens stay readable until the new flow completes.
    #[default]
    Preserve,
    /// Token material is dropped and the record goes back to pending.
    Replace,
}

impl FromStr for ReauthorizePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "replace" => Ok(Self::Replace),
            other => Err(format!("expected `preserve` or `replace`, got `{other}`")),
        }
    }
}

impl fmt::Display for ReauthorizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => f.write_str("preserve"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

#[derive(Clone)]
pub struct MicrosoftOAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_base_url: String,
    pub token_url: String,
    pub default_scope: Vec<String>,
    pub websocket_host: Option<String>,
    pub callback_timeout: Duration,
    pub reauthorize_policy: ReauthorizePolicy,
}

impl fmt::Debug for MicrosoftOAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrosoftOAuthSettings")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("authorization_base_url", &self.authorization_base_url)
            .field("token_url", &self.token_url)
            .field("default_scope", &self.default_scope)
            .field("websocket_host", &self.websocket_host)
            .field("callback_timeout", &self.callback_timeout)
            .field("reauthorize_policy", &self.reauthorize_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl MicrosoftOAuthSettings {
    pub(crate) fn for_tests() -> Self {
        Self {
            client_id: "client".into(),
            client_secret: "secret".into(),
            redirect_uri: "https://localhost/oauth2/microsoft/callback".into(),
            authorization_base_url: DEFAULT_AUTHORIZATION_BASE_URL.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            default_scope: split_scope(DEFAULT_SCOPE),
            websocket_host: None,
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECONDS),
            reauthorize_policy: ReauthorizePolicy::Preserve,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

pub struct Config {
    pub bind_address: SocketAddr,
    pub microsoft: MicrosoftOAuthSettings,
    pub jwt_keys: JwtKeys,
    pub rate_limit: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let microsoft = MicrosoftOAuthSettings {
            client_id: required_env_var("MICROSOFT_CLIENT_ID")?,
            client_secret: required_env_var("MICROSOFT_CLIENT_SECRET")?,
            redirect_uri: required_env_var("MICROSOFT_REDIRECT_URI")?,
            authorization_base_url: env_or(
                "MICROSOFT_AUTHORIZATION_BASE_URL",
                DEFAULT_AUTHORIZATION_BASE_URL,
            ),
            token_url: env_or("MICROSOFT_TOKEN_URL", DEFAULT_TOKEN_URL),
            default_scope: split_scope(&env_or("MICROSOFT_SCOPE", DEFAULT_SCOPE)),
            websocket_host: optional_env_var("MICROSOFT_WEBSOCKET_HOST"),
            callback_timeout: Duration::from_secs(parse_env_or(
                "MICROSOFT_CALLBACK_TIMEOUT_SECONDS",
                DEFAULT_CALLBACK_TIMEOUT_SECONDS,
            )?),
            reauthorize_policy: parse_env_or(
                "MICROSOFT_REAUTHORIZE_POLICY",
                ReauthorizePolicy::default(),
            )?,
        };

        if microsoft.default_scope.is_empty() {
            return Err(ConfigError::Invalid {
                key: "MICROSOFT_SCOPE",
                reason: "at least one scope is required".into(),
            });
        }

        let jwt_keys = JwtKeys::from_env()?;

        Ok(Config {
            bind_address: parse_env_or(
                "BIND_ADDRESS",
                SocketAddr::from(([127, 0, 0, 1], 9497)),
            )?,
            microsoft,
            jwt_keys,
            rate_limit: RateLimitSettings {
                // Default: 200ms/token (~5 req/sec)
                per_millisecond: parse_env_or("RATE_LIMITER_MILLISECONDS", 200)?,
                burst: parse_env_or("RATE_LIMITER_BURST", 20)?,
            },
        })
    }
}

pub struct DirectoryConfig {
    pub bind_address: SocketAddr,
    pub sources_path: PathBuf,
}

impl DirectoryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(DirectoryConfig {
            bind_address: parse_env_or(
                "DIRECTORY_BIND_ADDRESS",
                SocketAddr::from(([127, 0, 0, 1], 9489)),
            )?,
            sources_path: PathBuf::from(required_env_var("OFFICE365_SOURCES_PATH")?),
        })
    }
}

pub fn split_scope(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn required_env_var(key: &'static str) -> Result<String, ConfigError> {
    optional_env_var(key).ok_or(ConfigError::Missing(key))
}

fn optional_env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env_var(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional_env_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}
