use thiserror::Error;

#[derive(Error, Debug)]
pub enum MicrosoftOAuthError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint responded with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("no refresh token stored for this authorization")]
    MissingRefreshToken,
}
