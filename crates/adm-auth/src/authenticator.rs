//! Token lifecycle orchestration
//!
//! The authenticator ties the signers, the HTTP executor and the token store
//! together for one process run:
//!
//! ```text
//! Unauthenticated --authorize--> Authorizing --grant--> Authorized(token)
//!        |                            |
//!        |                            +--error--> Unauthenticated
//!        +--use_default / use_token------------> Authorized(token)
//! ```
//!
//! The store is passed in by the caller and only written by `authorize`.

use std::sync::Arc;

use common::Secret;
use tracing::info;
use transport::{HttpExecutor, HttpRequest};

use crate::basic::BasicSigner;
use crate::constants::base_url;
use crate::error::{Error, Result};
use crate::signer::{Credentials, SigningStrategy};
use crate::store::{ActiveToken, TokenStore};
use crate::token::{TokenGrant, request_password_token};

/// Where this process is in acquiring a usable token.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    Authorizing { client_id: String },
    Authorized(ActiveToken),
}

impl AuthState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authorizing { .. } => "authorizing",
            AuthState::Authorized(_) => "authorized",
        }
    }
}

pub struct Authenticator {
    executor: Arc<dyn HttpExecutor>,
    state: AuthState,
}

impl Authenticator {
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The token this process signs with, if one has been chosen.
    pub fn active(&self) -> Option<&ActiveToken> {
        match &self.state {
            AuthState::Authorized(active) => Some(active),
            _ => None,
        }
    }

    /// Obtain a token with the password grant and store it as the default.
    ///
    /// On success the token is appended to the client's record (unless
    /// already present), made the single default of the whole store, and the
    /// store is persisted. On failure the store is left untouched.
    pub async fn authorize(
        &mut self,
        store: &mut TokenStore,
        client_id: &str,
        client_secret: Secret<String>,
        username: &str,
        password: Secret<String>,
    ) -> Result<TokenGrant> {
        TokenStore::check_client_id(client_id)?;
        self.state = AuthState::Authorizing {
            client_id: client_id.to_string(),
        };

        let client = BasicSigner::new(client_id, client_secret);
        let base = base_url(&store.endpoint_for(Some(client_id)));
        let executor = self.executor.as_ref();
        let result = request_password_token(executor, &base, &client, username, &password).await;
        let grant = match result {
            Ok(grant) => grant,
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };

        let added = match store.record_token(client_id, &grant.access_token) {
            Ok(added) => added,
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };
        if let Err(e) = store.save().await {
            self.state = AuthState::Unauthenticated;
            return Err(e);
        }

        info!(client_id, new_token = added, "authorization succeeded");
        self.state = AuthState::Authorized(ActiveToken {
            client_id: client_id.to_string(),
            token: Secret::from(grant.access_token.as_str()),
        });
        Ok(grant)
    }

    /// Select the store's default token for this process.
    pub fn use_default(&mut self, store: &TokenStore) -> Result<ActiveToken> {
        let active = store.select_default()?;
        info!(client_id = %active.client_id, "using stored default token");
        self.state = AuthState::Authorized(active.clone());
        Ok(active)
    }

    /// Select the token stored for one particular client.
    pub fn use_client(&mut self, store: &TokenStore, client_id: &str) -> Result<ActiveToken> {
        let active = store.select_for_client(client_id)?;
        info!(client_id, "using stored token for client");
        self.state = AuthState::Authorized(active.clone());
        Ok(active)
    }

    /// Use an explicitly supplied token instead of the stored default.
    pub fn use_token(&mut self, client_id: impl Into<String>, token: Secret<String>) {
        self.state = AuthState::Authorized(ActiveToken {
            client_id: client_id.into(),
            token,
        });
    }

    /// Bearer signer for the active token.
    pub fn signer(&self) -> Result<Box<dyn SigningStrategy>> {
        let active = self.active().ok_or(Error::NoCredentials)?;
        Ok(Credentials::OAuth2 {
            client_id: active.client_id.clone(),
            access_token: active.token.clone(),
        }
        .into_signer())
    }

    /// Sign a request with the active token.
    pub fn sign(&self, request: &mut HttpRequest) -> Result<()> {
        self.signer()?
            .augment(&mut request.headers, &mut request.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use transport::RawResponse;

    /// Replays canned responses and records every request it was given.
    struct StubExecutor {
        responses: Mutex<VecDeque<RawResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl StubExecutor {
        fn replying(bodies: &[(u16, &str)]) -> Arc<Self> {
            let responses = bodies
                .iter()
                .map(|(status, body)| RawResponse {
                    status: *status,
                    body: body.to_string(),
                })
                .collect();
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpExecutor for StubExecutor {
        fn send<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = transport::Result<RawResponse>> + Send + 'a>> {
            self.requests.lock().unwrap().push(request);
            let response = self.responses.lock().unwrap().pop_front();
            Box::pin(async move {
                response.ok_or_else(|| transport::Error::Http("no stubbed response".into()))
            })
        }
    }

    async fn empty_store(dir: &tempfile::TempDir) -> TokenStore {
        let path = dir.path().join("profile.json");
        tokio::fs::write(&path, r#"{"default": {"endpoint": "api.omniture.com"}}"#)
            .await
            .unwrap();
        TokenStore::load(path).await.unwrap()
    }

    fn token_body(token: &str) -> String {
        format!(r#"{{"access_token":"{token}","expires_in":3600}}"#)
    }

    #[tokio::test]
    async fn authorize_sends_basic_signed_password_grant() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let body = token_body("t1");
        let executor = StubExecutor::replying(&[(200, body.as_str())]);
        let mut auth = Authenticator::new(executor.clone());

        auth.authorize(&mut store, "cid", "secret".into(), "analyst", "pw".into())
            .await
            .unwrap();

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.url, "https://api.omniture.com/token");
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Basic Y2lkOnNlY3JldA=="
        );
        assert_eq!(request.parameters["grant_type"], "password");
        assert_eq!(request.parameters["username"], "analyst");
        assert_eq!(request.parameters["password"], "pw");
    }

    #[tokio::test]
    async fn authorize_new_client_persists_token_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let body = token_body("t1");
        let mut auth = Authenticator::new(StubExecutor::replying(&[(200, body.as_str())]));

        let grant = auth
            .authorize(&mut store, "cid", "secret".into(), "analyst", "pw".into())
            .await
            .unwrap();
        assert_eq!(grant.access_token, "t1");
        assert_eq!(grant.payload["expires_in"], 3600);
        assert_eq!(auth.state().label(), "authorized");
        assert_eq!(auth.active().unwrap().token.expose(), "t1");

        let reloaded = TokenStore::load(store.path()).await.unwrap();
        let record = reloaded.get("cid").unwrap();
        assert_eq!(record.tokens, vec!["t1"]);
        assert_eq!(record.default.as_deref(), Some("t1"));
        assert_eq!(
            reloaded.connection().unwrap().endpoint.as_deref(),
            Some("api.omniture.com")
        );
    }

    #[tokio::test]
    async fn reauthorizing_appends_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let (t1, t2) = (token_body("t1"), token_body("t2"));
        let mut auth = Authenticator::new(StubExecutor::replying(&[
            (200, t1.as_str()),
            (200, t2.as_str()),
            (200, t1.as_str()),
        ]));

        for _ in 0..3 {
            auth.authorize(&mut store, "cid", "secret".into(), "analyst", "pw".into())
                .await
                .unwrap();
        }

        let reloaded = TokenStore::load(store.path()).await.unwrap();
        let record = reloaded.get("cid").unwrap();
        assert_eq!(record.tokens, vec!["t1", "t2"]);
        assert_eq!(record.default.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn second_client_takes_over_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let (t1, t2) = (token_body("t1"), token_body("t2"));
        let mut auth = Authenticator::new(StubExecutor::replying(&[
            (200, t1.as_str()),
            (200, t2.as_str()),
        ]));

        auth.authorize(&mut store, "A", "sa".into(), "analyst", "pw".into())
            .await
            .unwrap();
        auth.authorize(&mut store, "B", "sb".into(), "analyst", "pw".into())
            .await
            .unwrap();

        let reloaded = TokenStore::load(store.path()).await.unwrap();
        assert_eq!(reloaded.get("A").unwrap().default, None);
        assert_eq!(reloaded.get("B").unwrap().default.as_deref(), Some("t2"));

        let mut fresh = Authenticator::new(StubExecutor::replying(&[]));
        let active = fresh.use_default(&reloaded).unwrap();
        assert_eq!(active.client_id, "B");
        assert_eq!(active.token.expose(), "t2");
    }

    #[tokio::test]
    async fn rejected_client_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let before = tokio::fs::read_to_string(store.path()).await.unwrap();
        let mut auth = Authenticator::new(StubExecutor::replying(&[(
            401,
            r#"{"error":{"message":"invalid_client"}}"#,
        )]));

        let result = auth
            .authorize(&mut store, "cid", "wrong".into(), "analyst", "pw".into())
            .await;

        assert!(matches!(result, Err(Error::InvalidClientCredentials)));
        assert_eq!(auth.state().label(), "unauthenticated");
        assert!(store.is_empty());
        let after = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn remote_failure_carries_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let mut auth = Authenticator::new(StubExecutor::replying(&[(
            429,
            r#"{"errorMessage":"rate limited"}"#,
        )]));

        let result = auth
            .authorize(&mut store, "cid", "secret".into(), "analyst", "pw".into())
            .await;
        match result {
            Err(Error::RemoteAuthFailure(msg)) => assert_eq!(msg, "rate limited"),
            other => panic!("expected RemoteAuthFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_http_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let mut auth = Authenticator::new(StubExecutor::replying(&[]));

        let result = auth
            .authorize(&mut store, "cid", "secret".into(), "analyst", "pw".into())
            .await;
        assert!(matches!(result, Err(Error::Http(_))));
        assert_eq!(auth.state().label(), "unauthenticated");
    }

    #[tokio::test]
    async fn empty_client_secret_never_hits_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let executor = StubExecutor::replying(&[]);
        let mut auth = Authenticator::new(executor.clone());

        let result = auth
            .authorize(&mut store, "cid", "".into(), "analyst", "pw".into())
            .await;
        assert!(matches!(result, Err(Error::AuthNotConfigured(_))));
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn reserved_client_id_fails_before_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir).await;
        let before = tokio::fs::read_to_string(store.path()).await.unwrap();
        let body = token_body("t9");
        let executor = StubExecutor::replying(&[(200, body.as_str())]);
        let mut auth = Authenticator::new(executor.clone());

        let result = auth
            .authorize(&mut store, "default", "secret".into(), "analyst", "pw".into())
            .await;

        assert!(matches!(result, Err(Error::ReservedClientId(_))));
        assert!(executor.requests().is_empty());
        assert_eq!(auth.state().label(), "unauthenticated");
        let after = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(store.endpoint_for(None), "api.omniture.com");
    }

    #[tokio::test]
    async fn client_endpoint_override_is_used_for_token_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(
            &path,
            r#"{"default": {"endpoint": "api.omniture.com"}, "eu": {"endpoint": "api3.omniture.com"}}"#,
        )
        .await
        .unwrap();
        let mut store = TokenStore::load(path).await.unwrap();
        let body = token_body("t1");
        let executor = StubExecutor::replying(&[(200, body.as_str())]);
        let mut auth = Authenticator::new(executor.clone());

        auth.authorize(&mut store, "eu", "secret".into(), "analyst", "pw".into())
            .await
            .unwrap();
        assert_eq!(executor.requests()[0].url, "https://api3.omniture.com/token");
    }

    #[test]
    fn use_default_on_empty_store_is_no_credentials() {
        let store = TokenStore::parse("profile.json", "{}").unwrap();
        let mut auth = Authenticator::new(StubExecutor::replying(&[]));
        assert!(matches!(auth.use_default(&store), Err(Error::NoCredentials)));
        assert!(auth.active().is_none());
    }

    #[test]
    fn sign_requires_an_active_token() {
        let auth = Authenticator::new(StubExecutor::replying(&[]));
        let mut request = HttpRequest::post("https://api.omniture.com/admin/1.3/rest/");
        assert!(matches!(auth.sign(&mut request), Err(Error::NoCredentials)));
    }

    #[test]
    fn sign_uses_bearer_for_active_token() {
        let mut auth = Authenticator::new(StubExecutor::replying(&[]));
        auth.use_token("cid", "explicit-token".into());

        let mut request = HttpRequest::post("https://api.omniture.com/admin/1.3/rest/");
        auth.sign(&mut request).unwrap();
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Bearer explicit-token"
        );
    }
}
