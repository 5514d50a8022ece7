//! Error types for signing, token acquisition and the token store

/// Errors from the authentication core. Every variant ends the current
/// invocation; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} must be set before making a request")]
    AuthNotConfigured(String),

    #[error("invalid JSON in profile: {0}")]
    ConfigInvalid(String),

    #[error("profile not found at {0}: copy \"{0}.dist\" to \"{0}\" to get started")]
    ConfigMissing(String),

    #[error(
        "no stored credentials: use \"authorize\" to store your credentials before making a request"
    )]
    NoCredentials,

    #[error("\"{0}\" is reserved for connection defaults and cannot be used as a client id")]
    ReservedClientId(String),

    #[error("invalid client credentials")]
    InvalidClientCredentials,

    #[error("authorization failed: {0}")]
    RemoteAuthFailure(String),

    #[error("credential is not a valid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
