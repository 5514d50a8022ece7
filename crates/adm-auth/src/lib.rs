//! Authentication core for the adm analytics API client
//!
//! Signing strategies (WSSE, OAuth2 bearer, HTTP Basic), password-grant token
//! acquisition, and the JSON token store that remembers every token issued
//! per client id. Transport is abstracted behind `transport::HttpExecutor`,
//! so this crate never opens a socket itself.
//!
//! Token flow:
//! 1. `TokenStore::load()` reads the profile (must already exist)
//! 2. `Authenticator::authorize()` sends a Basic-signed password grant
//! 3. The token is recorded as the store-wide default and the profile rewritten
//! 4. Later runs call `Authenticator::use_default()` to pick it up
//! 5. `Authenticator::sign()` attaches it as a bearer token to API calls

pub mod authenticator;
pub mod basic;
pub mod constants;
pub mod error;
pub mod oauth2;
pub mod signer;
pub mod store;
pub mod token;
pub mod wsse;

pub use authenticator::{AuthState, Authenticator};
pub use basic::BasicSigner;
pub use constants::*;
pub use error::{Error, Result};
pub use oauth2::OAuth2Signer;
pub use signer::{Credentials, SigningStrategy};
pub use store::{ActiveToken, ClientTokenRecord, ConnectionDefaults, TokenStore};
pub use token::{TokenGrant, extract_error_message, parse_token_response, request_password_token};
pub use wsse::WsseSigner;
