//! WSSE UsernameToken signing
//!
//! Every request gets a fresh nonce and timestamp, and a SHA-1 digest over
//! `nonce || created || secret`:
//!
//! ```text
//! X-WSSE: UsernameToken Username="u", PasswordDigest="<b64 sha1>", Nonce="<b64 nonce>", Created="2012-03-01 12:00:00 UTC"
//! ```
//!
//! Servers recompute the digest from the same three strings, so the field
//! order, quoting and timestamp layout must not change.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use rand::RngExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha1::{Digest, Sha1};
use tracing::debug;
use transport::Parameters;

use crate::constants::WSSE_HEADER;
use crate::error::{Error, Result};
use crate::signer::SigningStrategy;

/// `Created` timestamp layout: UTC, space separated, literal zone suffix.
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub struct WsseSigner {
    username: String,
    secret: Secret<String>,
}

impl WsseSigner {
    pub fn new(username: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Header value for an explicit nonce and timestamp.
    pub fn header_value(&self, nonce: &str, created: &str) -> String {
        format!(
            "UsernameToken Username=\"{}\", PasswordDigest=\"{}\", Nonce=\"{}\", Created=\"{}\"",
            self.username,
            password_digest(nonce, created, self.secret.expose()),
            STANDARD.encode(nonce),
            created,
        )
    }
}

impl SigningStrategy for WsseSigner {
    fn scheme(&self) -> &'static str {
        "wsse"
    }

    fn augment(&self, headers: &mut HeaderMap, _parameters: &mut Parameters) -> Result<()> {
        if self.username.is_empty() || self.secret.is_blank() {
            return Err(Error::AuthNotConfigured("username and secret".into()));
        }

        let nonce = generate_nonce();
        let created = created_now();
        let value = HeaderValue::from_str(&self.header_value(&nonce, &created))
            .map_err(|e| Error::InvalidHeader(format!("WSSE username: {e}")))?;

        headers.append(HeaderName::from_static(WSSE_HEADER), value);
        debug!(username = %self.username, %created, "signed request with WSSE");
        Ok(())
    }
}

/// `base64(SHA1(nonce || created || secret))` over the raw bytes.
pub fn password_digest(nonce: &str, created: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(created.as_bytes());
    hasher.update(secret.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// 128 random bits as 32 lowercase hex characters.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Current UTC time in the `Created` layout.
pub fn created_now() -> String {
    chrono::Utc::now().format(CREATED_FORMAT).to_string()
}
