//! Command dispatch
//!
//! One `Commands` value per invocation. It owns the loaded token store and
//! the authenticator, and turns a parsed `Command` into the text printed on
//! stdout.

use std::sync::Arc;

use adm_auth::{Authenticator, REST_PATH, TokenStore, base_url};
use common::Secret;
use tracing::{debug, info, warn};
use transport::{BodyEncoding, HttpExecutor, HttpRequest};

use crate::cli::{AuthorizeArgs, Command, RequestArgs};
use crate::error::{Error, Result};
use crate::output::{render_response, render_token};
use crate::params;

pub struct Commands {
    executor: Arc<dyn HttpExecutor>,
    authenticator: Authenticator,
    store: TokenStore,
}

impl Commands {
    pub fn new(executor: Arc<dyn HttpExecutor>, store: TokenStore) -> Self {
        Self {
            authenticator: Authenticator::new(executor.clone()),
            executor,
            store,
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Authorize(args) => self.authorize(args).await,
            Command::Request(args) => self.request(args).await,
        }
    }

    /// Password grant; the token becomes the stored default.
    async fn authorize(&mut self, args: AuthorizeArgs) -> Result<String> {
        let grant = self
            .authenticator
            .authorize(
                &mut self.store,
                &args.client_id,
                Secret::from(args.client_secret),
                &args.username,
                Secret::from(args.password),
            )
            .await?;
        Ok(render_token(&grant.payload))
    }

    /// Call one API method with the selected token.
    async fn request(&mut self, args: RequestArgs) -> Result<String> {
        match (args.token, args.client.as_deref()) {
            (Some(token), client) => {
                self.authenticator
                    .use_token(client.unwrap_or_default(), Secret::from(token));
                debug!("using token supplied on the command line");
            }
            (None, Some(client)) => {
                self.authenticator.use_client(&self.store, client)?;
            }
            (None, None) => {
                self.authenticator.use_default(&self.store)?;
            }
        }

        let method = args
            .method
            .filter(|m| !m.trim().is_empty())
            .ok_or(Error::MissingMethod)?;
        let parameters = params::load(args.parameters.as_deref()).await?;

        let client_id = self
            .authenticator
            .active()
            .map(|active| active.client_id.clone())
            .unwrap_or_default();
        let endpoint = self
            .store
            .endpoint_for((!client_id.is_empty()).then_some(client_id.as_str()));
        let url = url::Url::parse_with_params(
            &format!("{}{REST_PATH}", base_url(&endpoint)),
            [("method", method.as_str())],
        )
        .map_err(|e| Error::Url(e.to_string()))?;

        let mut request = HttpRequest::post(url.as_str());
        request.parameters = parameters;
        if args.json {
            request.encoding = BodyEncoding::Json;
        }
        self.authenticator.sign(&mut request)?;

        let response = self.executor.send(request).await?;
        if !response.is_success() {
            warn!(method = %method, status = response.status, "API call failed");
            return Err(Error::ApiStatus {
                method,
                status: response.status,
                body: render_response(&response.body),
            });
        }

        info!(method = %method, status = response.status, "API call completed");
        Ok(render_response(&response.body))
    }
}
