//! reqwest-backed `HttpExecutor`
//!
//! One attempt per request, bounded by the client timeout. Non-2xx
//! responses are returned to the caller untouched so the auth core can
//! pull error messages out of the body.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, instrument};

use crate::form::to_form_pairs;
use crate::{BodyEncoding, Error, HttpExecutor, HttpRequest, RawResponse, Result};

const USER_AGENT: &str = concat!("adm-cli/", env!("CARGO_PKG_VERSION"));

pub struct ReqwestExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestExecutor {
    /// Build an executor whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            parameters,
            encoding,
        } = request;

        let mut builder = self.client.request(method.clone(), &url).headers(headers);
        builder = if method == Method::GET {
            builder.query(&to_form_pairs(&parameters))
        } else {
            match encoding {
                BodyEncoding::Form => builder.form(&to_form_pairs(&parameters)),
                BodyEncoding::Json => builder.json(&serde_json::Value::Object(parameters)),
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{url} after {}s", self.timeout.as_secs()))
            } else {
                Error::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Body(e.to_string()))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(RawResponse { status, body })
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>> {
        Box::pin(self.execute(request))
    }
}
