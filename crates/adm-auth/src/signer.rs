//! Signing-strategy abstraction
//!
//! A signer adds authentication material to an outbound request: headers,
//! and for some schemes parameters. Signing is additive only; nothing already
//! on the request is removed or replaced. The scheme is fixed when the signer
//! is built from `Credentials`.

use common::Secret;
use reqwest::header::HeaderMap;
use transport::Parameters;

use crate::basic::BasicSigner;
use crate::error::Result;
use crate::oauth2::OAuth2Signer;
use crate::wsse::WsseSigner;

/// Adds authentication to a request about to be sent.
pub trait SigningStrategy: Send + Sync {
    /// Scheme name for logging ("wsse", "oauth2", "basic").
    fn scheme(&self) -> &'static str;

    /// Append this scheme's headers and parameters.
    ///
    /// Fails with `AuthNotConfigured` when the credentials are empty.
    fn augment(&self, headers: &mut HeaderMap, parameters: &mut Parameters) -> Result<()>;
}

/// Credentials for exactly one signing scheme.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Pre-shared secret, signed per request with a nonce digest.
    Wsse {
        username: String,
        secret: Secret<String>,
    },
    /// Bearer token previously issued to `client_id`.
    OAuth2 {
        client_id: String,
        access_token: Secret<String>,
    },
    /// Client id/secret sent as HTTP Basic.
    Basic {
        client_id: String,
        client_secret: Secret<String>,
    },
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Wsse { .. } => "wsse",
            Credentials::OAuth2 { .. } => "oauth2",
            Credentials::Basic { .. } => "basic",
        }
    }

    /// Build the signer matching these credentials.
    pub fn into_signer(self) -> Box<dyn SigningStrategy> {
        match self {
            Credentials::Wsse { username, secret } => Box::new(WsseSigner::new(username, secret)),
            Credentials::OAuth2 {
                client_id,
                access_token,
            } => Box::new(OAuth2Signer::new(client_id, access_token)),
            Credentials::Basic {
                client_id,
                client_secret,
            } => Box::new(BasicSigner::new(client_id, client_secret)),
        }
    }
}
