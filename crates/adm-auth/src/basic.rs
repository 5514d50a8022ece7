//! HTTP Basic signing with the OAuth client id and secret
//!
//! This is the transport credential of the password-grant request: the
//! client authenticates itself with Basic while the body carries the user's
//! username and password.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use transport::Parameters;

use crate::error::{Error, Result};
use crate::signer::SigningStrategy;

pub struct BasicSigner {
    client_id: String,
    client_secret: Secret<String>,
}

impl BasicSigner {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl SigningStrategy for BasicSigner {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    fn augment(&self, headers: &mut HeaderMap, _parameters: &mut Parameters) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_blank() {
            return Err(Error::AuthNotConfigured("client id and client secret".into()));
        }

        let encoded = STANDARD.encode(format!(
            "{}:{}",
            self.client_id,
            self.client_secret.expose()
        ));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| Error::InvalidHeader(format!("basic credentials: {e}")))?;
        value.set_sensitive(true);
        headers.append(AUTHORIZATION, value);
        Ok(())
    }
}
