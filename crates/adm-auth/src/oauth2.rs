//! OAuth2 bearer signing for API calls made with a stored token

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;
use transport::Parameters;

use crate::error::{Error, Result};
use crate::signer::SigningStrategy;

pub struct OAuth2Signer {
    client_id: String,
    access_token: Secret<String>,
}

impl OAuth2Signer {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl SigningStrategy for OAuth2Signer {
    fn scheme(&self) -> &'static str {
        "oauth2"
    }

    fn augment(&self, headers: &mut HeaderMap, _parameters: &mut Parameters) -> Result<()> {
        if self.access_token.is_blank() {
            return Err(Error::AuthNotConfigured("access token".into()));
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.access_token.expose()))
            .map_err(|e| Error::InvalidHeader(format!("access token: {e}")))?;
        value.set_sensitive(true);
        headers.append(AUTHORIZATION, value);
        debug!(client_id = %self.client_id, "signed request with bearer token");
        Ok(())
    }
}
