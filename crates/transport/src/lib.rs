//! HTTP executor abstraction
//!
//! The authentication core never talks to reqwest directly. It builds an
//! `HttpRequest` (method, URL, signed headers, parameters) and hands it to an
//! `HttpExecutor`, which returns the status and raw body. Tests substitute an
//! in-memory executor; the CLI uses `ReqwestExecutor`.

pub mod executor;
pub mod form;

pub use executor::ReqwestExecutor;
pub use form::to_form_pairs;

use reqwest::Method;
use reqwest::header::HeaderMap;
use std::future::Future;
use std::pin::Pin;

/// Request parameters. Values are usually strings, but parameter files may
/// carry nested objects and arrays.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// How parameters travel on a non-GET request. GET always uses the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Form,
    Json,
}

/// A fully signed outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub parameters: Parameters,
    pub encoding: BodyEncoding,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            parameters: Parameters::new(),
            encoding: BodyEncoding::default(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }
}

/// Status and undecoded body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON, or `None` when it isn't JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Transport failures. A non-2xx status is not an error at this layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("could not read response body: {0}")]
    Body(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Sends requests on behalf of the auth core and the CLI.
///
/// Uses `Pin<Box<dyn Future>>` so callers can hold `&dyn HttpExecutor`.
pub trait HttpExecutor: Send + Sync {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>>;
}
