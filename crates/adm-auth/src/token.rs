//! Password-grant token acquisition
//!
//! POSTs `grant_type=password` with the user's username and password to the
//! token endpoint, authenticating the client itself with HTTP Basic. One
//! attempt per call; failures are classified from the response body.
//!
//! Error bodies come in a few shapes. The message is taken from, in order:
//! a non-empty `errorMessage`, `error.message`, or a bare string `error`.
//! `invalid_client` means the client id/secret pair was rejected.
//!
//! The bare string `error` is the RFC 6749 shape (`{"error":"invalid_grant"}`).
//! The older analytics token endpoint only sent the first two; without the
//! third fallback such a body would be reported whole instead of as
//! `invalid_grant`.

use common::{Secret, to_pretty_json};
use serde_json::Value;
use tracing::{debug, warn};
use transport::{HttpExecutor, HttpRequest, RawResponse};

use crate::basic::BasicSigner;
use crate::constants::{INVALID_CLIENT, PASSWORD_GRANT, TOKEN_PATH};
use crate::error::{Error, Result};
use crate::signer::SigningStrategy;

/// A successful token response.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// The full decoded response, reported back to the user verbatim.
    pub payload: Value,
}

/// Exchange a username and password for an access token.
pub async fn request_password_token(
    executor: &dyn HttpExecutor,
    base_url: &str,
    client: &BasicSigner,
    username: &str,
    password: &Secret<String>,
) -> Result<TokenGrant> {
    let mut request = HttpRequest::post(format!("{base_url}{TOKEN_PATH}"));
    client.augment(&mut request.headers, &mut request.parameters)?;
    request
        .parameters
        .insert("grant_type".into(), Value::from(PASSWORD_GRANT));
    request
        .parameters
        .insert("username".into(), Value::from(username));
    request
        .parameters
        .insert("password".into(), Value::from(password.expose().as_str()));

    debug!(client_id = client.client_id(), url = %request.url, "requesting password grant");
    let response = executor
        .send(request)
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    parse_token_response(&response)
}

/// Turn a token endpoint response into a grant or a classified error.
///
/// A 2xx without a usable `access_token` counts as a failure.
pub fn parse_token_response(response: &RawResponse) -> Result<TokenGrant> {
    let decoded = response.json();

    if response.is_success()
        && let Some(payload) = &decoded
        && let Some(token) = payload.get("access_token").and_then(Value::as_str)
        && !token.is_empty()
    {
        return Ok(TokenGrant {
            access_token: token.to_string(),
            payload: payload.clone(),
        });
    }

    let error = classify_failure(response, decoded.as_ref());
    warn!(status = response.status, error = %error, "token request rejected");
    Err(error)
}

/// Pull a human-readable message out of a decoded error body.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    body.get("errorMessage")
        .and_then(non_empty)
        .or_else(|| body.get("error").and_then(|e| e.get("message")).and_then(non_empty))
        .or_else(|| body.get("error").and_then(non_empty))
}

fn classify_failure(response: &RawResponse, decoded: Option<&Value>) -> Error {
    match decoded.and_then(extract_error_message) {
        Some(message) if message == INVALID_CLIENT => Error::InvalidClientCredentials,
        Some(message) => Error::RemoteAuthFailure(message),
        None => Error::RemoteAuthFailure(raw_report(response, decoded)),
    }
}

/// Whatever the server sent, in the most readable form available.
fn raw_report(response: &RawResponse, decoded: Option<&Value>) -> String {
    if let Some(value) = decoded
        && let Ok(pretty) = to_pretty_json(value)
    {
        return pretty;
    }
    if response.body.trim().is_empty() {
        format!("HTTP {} with empty body", response.status)
    } else {
        response.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn success_yields_token_and_payload() {
        let grant = parse_token_response(&response(
            200,
            r#"{"access_token":"abc","expires_in":3600,"token_type":"bearer"}"#,
        ))
        .unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.payload["expires_in"], 3600);
    }

    #[test]
    fn nested_invalid_client_is_invalid_credentials() {
        let result = parse_token_response(&response(
            400,
            r#"{"error":{"message":"invalid_client"}}"#,
        ));
        assert!(matches!(result, Err(Error::InvalidClientCredentials)));
    }

    #[test]
    fn flat_invalid_client_is_invalid_credentials() {
        let result = parse_token_response(&response(401, r#"{"error":"invalid_client"}"#));
        assert!(matches!(result, Err(Error::InvalidClientCredentials)));
    }

    #[test]
    fn bare_error_string_is_the_message() {
        let result = parse_token_response(&response(400, r#"{"error":"invalid_grant"}"#));
        match result {
            Err(Error::RemoteAuthFailure(message)) => assert_eq!(message, "invalid_grant"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[test]
    fn error_message_is_surfaced() {
        let result = parse_token_response(&response(429, r#"{"errorMessage":"rate limited"}"#));
        match result {
            Err(Error::RemoteAuthFailure(msg)) => assert_eq!(msg, "rate limited"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[test]
    fn error_message_takes_precedence_over_nested_message() {
        let body = json!({
            "errorMessage": "user locked",
            "error": {"message": "invalid_client"}
        });
        assert_eq!(extract_error_message(&body).as_deref(), Some("user locked"));
    }

    #[test]
    fn empty_error_message_falls_back_to_nested() {
        let body = json!({"errorMessage": "", "error": {"message": "invalid_grant"}});
        assert_eq!(extract_error_message(&body).as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn unrecognised_json_is_reported_whole() {
        let result = parse_token_response(&response(500, r#"{"fault":"backend down"}"#));
        match result {
            Err(Error::RemoteAuthFailure(msg)) => {
                assert!(msg.contains("\"fault\": \"backend down\""), "got: {msg}")
            }
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_reported_raw() {
        let result = parse_token_response(&response(502, "<html>Bad Gateway</html>"));
        match result {
            Err(Error::RemoteAuthFailure(msg)) => assert_eq!(msg, "<html>Bad Gateway</html>"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_reports_status() {
        let result = parse_token_response(&response(503, ""));
        match result {
            Err(Error::RemoteAuthFailure(msg)) => assert_eq!(msg, "HTTP 503 with empty body"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[test]
    fn success_without_token_is_a_failure() {
        let result = parse_token_response(&response(200, r#"{"token_type":"bearer"}"#));
        assert!(matches!(result, Err(Error::RemoteAuthFailure(_))));

        let result = parse_token_response(&response(200, r#"{"access_token":""}"#));
        assert!(matches!(result, Err(Error::RemoteAuthFailure(_))));
    }

    #[test]
    fn error_status_with_token_is_still_a_failure() {
        let result = parse_token_response(&response(
            400,
            r#"{"access_token":"abc","errorMessage":"expired password"}"#,
        ));
        match result {
            Err(Error::RemoteAuthFailure(msg)) => assert_eq!(msg, "expired password"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }
}
