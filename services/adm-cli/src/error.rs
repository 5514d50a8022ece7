//! CLI-level errors
//!
//! Auth and transport errors pass through unchanged; the variants here cover
//! what only the command layer can get wrong: settings, parameter input and
//! API calls that come back non-2xx.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] adm_auth::Error),

    #[error(transparent)]
    Transport(#[from] transport::Error),

    #[error("invalid setting: {0}")]
    Settings(String),

    #[error("you must supply the method you want to call as the first argument to \"request\"")]
    MissingMethod,

    #[error("File {0} not found")]
    ParameterFileMissing(String),

    #[error("could not read parameter file {path}: {reason}")]
    ParameterFile { path: String, reason: String },

    #[error("invalid {format} parameters: {reason}")]
    ParameterParse {
        format: &'static str,
        reason: String,
    },

    #[error("invalid API URL: {0}")]
    Url(String),

    #[error("{method} returned HTTP {status}:\n{body}")]
    ApiStatus {
        method: String,
        status: u16,
        body: String,
    },
}

/// Result alias using the CLI Error
pub type Result<T> = std::result::Result<T, Error>;
