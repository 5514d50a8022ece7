//! Runtime settings
//!
//! Precedence: CLI flags > env vars (`ADM_PROFILE`, `ADM_TIMEOUT_SECS`) > defaults.
//! clap resolves the first two; this module validates what it produced.

use crate::cli::Cli;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Validated settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile_path: PathBuf,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::new(cli.profile.clone(), cli.timeout)
    }

    pub fn new(profile_path: PathBuf, timeout_secs: u64) -> Result<Self> {
        if timeout_secs == 0 {
            return Err(Error::Settings("timeout must be greater than 0".into()));
        }
        if profile_path.as_os_str().is_empty() {
            return Err(Error::Settings("profile path must not be empty".into()));
        }
        Ok(Self {
            profile_path,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
