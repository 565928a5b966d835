//! Connection configuration.
//!
//! A [`ConfluenceConfig`] is the single input a [`ConfluenceConnection`] is
//! built from. It is usually deserialized from a JSON file whose keys follow
//! the camelCase names used by Atlassian tooling:
//!
//! ```json
//! {
//!   "connection": { "host": "https://example.atlassian.net", "username": "me@example.com", "apiToken": "..." },
//!   "addon": { "key": "com.example.bot", "name": "Example Bot" },
//!   "baseUrl": "https://bots.example.com/m/confluence",
//!   "webhooks": [{ "event": "page_created", "path": "/pages" }],
//!   "connectionString": "sqlite://tenants.db"
//! }
//! ```
//!
//! [`ConfluenceConnection`]: crate::connection::ConfluenceConnection

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::credentials::{CredentialError, CredentialsProvider};

/// Default request timeout for the REST client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default ceiling on outbound requests per second.
pub const DEFAULT_RATE_LIMIT: usize = 10;

/// Default maximum age accepted for inbound add-on JWTs.
pub const DEFAULT_MAX_TOKEN_AGE_SECS: u64 = 900;

/// Errors raised while loading or completing a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("invalid Confluence host {host:?}: {source}")]
  InvalidHost {
    host: String,
    #[source]
    source: url::ParseError,
  },
  #[error(transparent)]
  Credentials(#[from] CredentialError),
}

/// Top-level configuration for a Confluence connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceConfig {
  /// Parameters for the REST client.
  pub connection: ConnectionInfo,

  /// Add-on identity. When absent, or when key/name are empty, the connection
  /// is a plain API client and exposes no endpoints.
  #[serde(default)]
  pub addon: Option<AddonInfo>,

  /// Externally reachable prefix for add-on endpoints, i.e. everything before
  /// the `/jira/addon` part of the path (e.g. `https://example.com/m/mymod`).
  #[serde(default)]
  pub base_url: Option<String>,

  /// Webhook subscriptions, registered in this order.
  #[serde(default)]
  pub webhooks: Vec<WebhookSubscription>,

  /// SQLite URL for installed-tenant records. In-memory when absent.
  #[serde(default)]
  pub connection_string: Option<String>,

  /// Maximum age, in seconds, of an inbound JWT.
  #[serde(default)]
  pub max_token_age_secs: Option<u64>,
}

/// Host and credentials for the Confluence REST API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
  /// Base URL of the Confluence site (e.g. `https://example.atlassian.net`).
  pub host: String,
  /// Account email address.
  #[serde(default)]
  pub username: String,
  /// API token created at <https://id.atlassian.com/manage-profile/security/api-tokens>.
  #[serde(default)]
  pub api_token: String,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Max requests per second.
  #[serde(default = "default_rate_limit")]
  pub rate_limit: usize,
}

/// Descriptor identity for the add-on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddonInfo {
  #[serde(default)]
  pub key: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub vendor: Option<Vendor>,
}

/// Vendor block of the add-on descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
  pub name: String,
  pub url: String,
}

/// A webhook the add-on subscribes to.
///
/// `path` names the handler inbound events are routed to (see
/// [`AtlassianAddon::on_webhook`](crate::addon::AtlassianAddon::on_webhook)).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
  pub event: String,
  pub path: String,
  /// Optional server-side filter published in the descriptor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<String>,
  /// Ask the product to omit the request body.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exclude_body: Option<bool>,
}

fn default_timeout_secs() -> u64 {
  DEFAULT_TIMEOUT_SECS
}

fn default_rate_limit() -> usize {
  DEFAULT_RATE_LIMIT
}

impl ConnectionInfo {
  /// Connection parameters with default timeout and rate limit.
  pub fn new(host: impl Into<String>, username: impl Into<String>, api_token: impl Into<String>) -> Self {
    Self {
      host: host.into(),
      username: username.into(),
      api_token: api_token.into(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
      rate_limit: DEFAULT_RATE_LIMIT,
    }
  }

  /// Hostname portion of [`host`](Self::host), used for credential lookups.
  ///
  /// A host without a scheme is treated as `https://`.
  pub fn hostname(&self) -> Result<String, ConfigError> {
    let raw = self.host.trim();
    let parsed = if raw.contains("://") {
      Url::parse(raw)
    } else {
      Url::parse(&format!("https://{raw}"))
    };

    let parsed = parsed.map_err(|source| ConfigError::InvalidHost {
      host: self.host.clone(),
      source,
    })?;

    parsed
      .host_str()
      .map(str::to_string)
      .ok_or_else(|| ConfigError::InvalidHost {
        host: self.host.clone(),
        source: url::ParseError::EmptyHost,
      })
  }

  fn has_credentials(&self) -> bool {
    !self.username.is_empty() && !self.api_token.is_empty()
  }
}

impl AddonInfo {
  /// Add-on with just the two required fields.
  pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      key: Some(key.into()),
      name: Some(name.into()),
      description: None,
      vendor: None,
    }
  }

  /// Key and name, when both are present and non-empty.
  pub fn identity(&self) -> Option<(&str, &str)> {
    let key = self.key.as_deref().filter(|k| !k.trim().is_empty())?;
    let name = self.name.as_deref().filter(|n| !n.trim().is_empty())?;
    Some((key, name))
  }
}

impl WebhookSubscription {
  pub fn new(event: impl Into<String>, path: impl Into<String>) -> Self {
    Self {
      event: event.into(),
      path: path.into(),
      filter: None,
      exclude_body: None,
    }
  }
}

impl ConfluenceConfig {
  /// A plain API-client configuration with no add-on.
  pub fn new(connection: ConnectionInfo) -> Self {
    Self {
      connection,
      addon: None,
      base_url: None,
      webhooks: Vec::new(),
      connection_string: None,
      max_token_age_secs: None,
    }
  }

  /// Load a configuration from a JSON file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!(config_path = %path.display(), "Loading configuration");

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    debug!(
      host = %config.connection.host,
      addon = config.addon_identity().is_some(),
      webhooks = config.webhooks.len(),
      "Parsed configuration"
    );

    Ok(config)
  }

  /// Key and name of the configured add-on, if add-on mode is active.
  pub fn addon_identity(&self) -> Option<(&str, &str)> {
    self.addon.as_ref().and_then(AddonInfo::identity)
  }

  /// Override connection parameters with explicitly provided values (CLI
  /// flags or environment variables). `None` leaves the field untouched.
  pub fn apply_overrides(&mut self, host: Option<&str>, username: Option<&str>, api_token: Option<&str>) {
    if let Some(host) = host {
      self.connection.host = host.to_string();
    }
    if let Some(username) = username {
      self.connection.username = username.to_string();
    }
    if let Some(api_token) = api_token {
      self.connection.api_token = api_token.to_string();
    }
  }

  /// Fill a missing username or API token from a credentials provider.
  ///
  /// Values already present in the configuration always win. Missing
  /// credentials after the lookup are not an error here; the first API call
  /// reports the authentication failure.
  pub fn resolve_credentials(&mut self, provider: &dyn CredentialsProvider) -> Result<(), ConfigError> {
    if self.connection.has_credentials() {
      return Ok(());
    }

    let host = self.connection.hostname()?;
    match provider.get_credentials(&host)? {
      Some(credential) => {
        debug!(%host, "Filling missing credentials from provider");
        if self.connection.username.is_empty() {
          self.connection.username = credential.username;
        }
        if self.connection.api_token.is_empty() {
          self.connection.api_token = credential.password;
        }
      }
      None => {
        warn!(%host, "No credentials configured for host");
      }
    }

    Ok(())
  }

  /// Effective max token age for inbound JWTs.
  pub fn max_token_age_secs(&self) -> u64 {
    self.max_token_age_secs.unwrap_or(DEFAULT_MAX_TOKEN_AGE_SECS)
  }
}
