use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("no session token supplied")]
    MissingSessionToken,
    #[error("no user uuid supplied")]
    MissingUserUuid,
    #[error("invalid user uuid: {0}")]
    InvalidUserUuid(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} responded with status {status}")]
    UnexpectedStatus { service: &'static str, status: u16 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("source configuration error: {0}")]
    Config(String),
}
