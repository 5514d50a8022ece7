//! Token store backed by the JSON profile file
//!
//! The profile maps client ids to the tokens issued to them, plus one
//! reserved `"default"` entry holding connection defaults:
//!
//! ```json
//! {
//!   "default": { "endpoint": "api.omniture.com" },
//!   "myClientId": { "tokens": ["tok1", "tok2"], "default": "tok2" }
//! }
//! ```
//!
//! The top-level `"default"` is connection configuration; a record's
//! `"default"` is its active token. The two never mix: the former loads into
//! `ConnectionDefaults`, the latter lives on `ClientTokenRecord`.
//!
//! The file must exist before first use; it is never created here. Writes
//! replace the whole document atomically (temp file + rename). There is no
//! cross-process lock, so two concurrent `authorize` runs can lose one
//! update.

use std::path::{Path, PathBuf};

use common::{Secret, to_pretty_json};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::constants::{CONNECTION_DEFAULTS_KEY, DEFAULT_ENDPOINT};
use crate::error::{Error, Result};

/// Connection settings shared by every client (`"default"` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Keys this client doesn't interpret, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tokens issued to one client id.
///
/// `tokens` is in acquisition order without duplicates; `default`, when set,
/// is one of them. `parse` rejects profiles that break either rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientTokenRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Per-client host, overriding the connection default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientTokenRecord {
    fn active_default(&self) -> Option<&str> {
        self.default.as_deref().filter(|t| !t.is_empty())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (index, token) in self.tokens.iter().enumerate() {
            if self.tokens[..index].contains(token) {
                return Err("duplicate entry in \"tokens\"".into());
            }
        }
        if let Some(default) = self.active_default()
            && !self.tokens.iter().any(|t| t == default)
        {
            return Err("\"default\" is not one of its \"tokens\"".into());
        }
        Ok(())
    }
}

/// The token chosen for this process. Held in memory only.
#[derive(Debug, Clone)]
pub struct ActiveToken {
    pub client_id: String,
    pub token: Secret<String>,
}

/// In-memory view of the profile file.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    connection: Option<ConnectionDefaults>,
    clients: IndexMap<String, ClientTokenRecord>,
}

impl TokenStore {
    /// Read and parse the profile at `path`.
    ///
    /// A missing file is `ConfigMissing` (the user has to bootstrap it);
    /// anything unparseable is `ConfigInvalid`. Neither case touches the file.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigMissing(path.display().to_string()));
            }
            Err(e) => {
                return Err(Error::Io(format!("reading profile {}: {e}", path.display())));
            }
        };

        let store = Self::parse(path, &contents)?;
        info!(
            path = %store.path.display(),
            clients = store.clients.len(),
            "loaded token store"
        );
        Ok(store)
    }

    /// Parse profile contents without touching the filesystem.
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Result<Self> {
        let document: Map<String, Value> =
            serde_json::from_str(contents).map_err(|e| Error::ConfigInvalid(e.to_string()))?;

        let mut connection = None;
        let mut clients = IndexMap::with_capacity(document.len());
        for (key, value) in document {
            if key == CONNECTION_DEFAULTS_KEY {
                let defaults: ConnectionDefaults = serde_json::from_value(value)
                    .map_err(|e| Error::ConfigInvalid(format!("\"{key}\" entry: {e}")))?;
                connection = Some(defaults);
            } else {
                let record: ClientTokenRecord = serde_json::from_value(value)
                    .map_err(|e| Error::ConfigInvalid(format!("client \"{key}\": {e}")))?;
                record
                    .validate()
                    .map_err(|reason| Error::ConfigInvalid(format!("client \"{key}\": {reason}")))?;
                clients.insert(key, record);
            }
        }

        Ok(Self {
            path: path.into(),
            connection,
            clients,
        })
    }

    /// Rewrite the whole profile.
    pub async fn save(&self) -> Result<()> {
        let json = self.to_json()?;
        write_atomic(&self.path, &json).await
    }

    /// Serialize to the on-disk layout: connection defaults first, then
    /// clients in store order.
    pub fn to_json(&self) -> Result<String> {
        let mut document = Map::new();
        if let Some(connection) = &self.connection {
            document.insert(CONNECTION_DEFAULTS_KEY.to_string(), to_value(connection)?);
        }
        for (client_id, record) in &self.clients {
            document.insert(client_id.clone(), to_value(record)?);
        }
        to_pretty_json(&Value::Object(document))
            .map_err(|e| Error::ConfigInvalid(format!("serializing profile: {e}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> Option<&ConnectionDefaults> {
        self.connection.as_ref()
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientTokenRecord> {
        self.clients.get(client_id)
    }

    /// Client ids in store order.
    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Host for requests made as `client_id`: the record's own endpoint,
    /// else the connection default, else `DEFAULT_ENDPOINT`.
    pub fn endpoint_for(&self, client_id: Option<&str>) -> String {
        client_id
            .and_then(|id| self.clients.get(id))
            .and_then(|record| record.endpoint.clone())
            .or_else(|| self.connection.as_ref().and_then(|c| c.endpoint.clone()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Fails for ids that would collide with the connection-defaults entry.
    pub fn check_client_id(client_id: &str) -> Result<()> {
        if client_id == CONNECTION_DEFAULTS_KEY {
            return Err(Error::ReservedClientId(client_id.to_string()));
        }
        Ok(())
    }

    /// Record a newly issued token and make it the only default in the store.
    ///
    /// The token is appended to the client's list unless already present.
    /// Every other record loses its `default`. Returns whether the token was
    /// new for this client. Does not persist; call `save`.
    pub fn record_token(&mut self, client_id: &str, token: &str) -> Result<bool> {
        Self::check_client_id(client_id)?;
        let record = self.clients.entry(client_id.to_string()).or_default();
        let added = !record.tokens.iter().any(|t| t == token);
        if added {
            record.tokens.push(token.to_string());
        }

        for record in self.clients.values_mut() {
            record.default = None;
        }
        if let Some(record) = self.clients.get_mut(client_id) {
            record.default = Some(token.to_string());
        }

        debug!(client_id, added, "recorded token");
        Ok(added)
    }

    /// Pick the token a request should use.
    ///
    /// The first record (in store order) with a `default` wins. Without any
    /// default, the most recently added token of the first record that has
    /// tokens is used.
    pub fn select_default(&self) -> Result<ActiveToken> {
        let chosen = self
            .clients
            .iter()
            .find_map(|(id, record)| record.active_default().map(|t| (id, t)))
            .or_else(|| {
                self.clients
                    .iter()
                    .find_map(|(id, record)| record.tokens.last().map(|t| (id, t.as_str())))
            });

        match chosen {
            Some((client_id, token)) => Ok(ActiveToken {
                client_id: client_id.clone(),
                token: Secret::from(token),
            }),
            None => Err(Error::NoCredentials),
        }
    }

    /// Token for one named client: its `default`, else its newest token.
    pub fn select_for_client(&self, client_id: &str) -> Result<ActiveToken> {
        let record = self.clients.get(client_id).ok_or(Error::NoCredentials)?;
        let token = record
            .active_default()
            .or_else(|| record.tokens.last().map(String::as_str))
            .ok_or(Error::NoCredentials)?;
        Ok(ActiveToken {
            client_id: client_id.to_string(),
            token: Secret::from(token),
        })
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::ConfigInvalid(format!("serializing profile: {e}")))
}

/// Replace `path` with `contents` via a sibling temp file and rename, so a
/// crash mid-write leaves the previous document intact. The file holds
/// tokens, so it is written 0600 on unix.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("profile path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("profile.json");
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, contents.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp profile: {e}")))?;

    if let Err(e) = finish_atomic(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    debug!(path = %path.display(), "persisted token store");
    Ok(())
}

/// Restrict the temp file to the owner, then move it over `path`.
async fn finish_atomic(tmp_path: &Path, path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting profile permissions: {e}")))?;
    }

    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("replacing profile: {e}")))
}
