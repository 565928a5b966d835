//! Atlassian Connect add-on host.
//!
//! An [`AtlassianAddon`] serves the app descriptor, tracks installations, and
//! routes authenticated webhook deliveries to registered handlers. All of its
//! endpoints live under one mount path on the host web app:
//!
//! | Method | Path                         | Purpose                       |
//! |--------|------------------------------|-------------------------------|
//! | GET    | `{mount}/addon`              | app descriptor                |
//! | POST   | `{mount}/installed`          | install lifecycle callback    |
//! | POST   | `{mount}/uninstalled`        | uninstall lifecycle callback  |
//! | POST   | `{mount}/webhooks/{event}`   | webhook receiver              |

mod descriptor;
mod error;
pub mod jwt;
mod routes;
mod store;
mod webhook;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, Method, Uri};
use tracing::{debug, info, warn};

pub use self::descriptor::{AuthenticationType, Descriptor, DescriptorInfo, WebhookModule};
pub use self::error::AddonError;
pub use self::jwt::ConnectClaims;
pub use self::store::{IN_MEMORY, Tenant, TenantStore};
pub use self::webhook::{WebhookEvent, WebhookHandler};
use crate::config::{DEFAULT_MAX_TOKEN_AGE_SECS, WebhookSubscription};
use crate::sub_app::SubApp;

/// Credentials the add-on can use to call back into the product.
#[derive(Clone, PartialEq, Eq)]
pub struct AddonCredentials {
  pub api_token: String,
  pub username: String,
  pub host: String,
}

impl std::fmt::Debug for AddonCredentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AddonCredentials")
      .field("username", &self.username)
      .field("host", &self.host)
      .finish_non_exhaustive()
  }
}

/// Everything needed to construct an add-on.
#[derive(Debug, Clone)]
pub struct AddonSettings {
  pub descriptor: DescriptorInfo,
  /// Host web app to mount on. Without one the router is only reachable via
  /// [`AtlassianAddon::router`].
  pub sub_app: Option<SubApp>,
  pub mount_path: String,
  /// SQLite URL for tenant records; in-memory when `None`.
  pub connection_string: Option<String>,
  /// Oldest inbound JWT accepted; `None` uses the default.
  pub max_token_age: Option<Duration>,
  pub credentials: AddonCredentials,
}

struct AddonInner {
  descriptor: DescriptorInfo,
  mount_path: String,
  credentials: AddonCredentials,
  max_token_age: Duration,
  tenants: TenantStore,
  webhooks: RwLock<Vec<WebhookSubscription>>,
  handlers: RwLock<HashMap<String, Arc<dyn WebhookHandler>>>,
}

/// A running add-on. Clones share state.
#[derive(Clone)]
pub struct AtlassianAddon {
  inner: Arc<AddonInner>,
}

impl std::fmt::Debug for AtlassianAddon {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AtlassianAddon")
      .field("key", &self.inner.descriptor.key)
      .field("mount_path", &self.inner.mount_path)
      .field("webhooks", &self.webhooks().len())
      .finish_non_exhaustive()
  }
}

impl AtlassianAddon {
  /// Create the add-on and mount it on the host web app, if one was given.
  ///
  /// # Errors
  /// Returns [`AddonError::InvalidConnectionString`] when the persistence
  /// connection string cannot be used.
  pub fn new(settings: AddonSettings) -> Result<Self, AddonError> {
    let connection_string = settings.connection_string.as_deref().unwrap_or(IN_MEMORY);
    let tenants = TenantStore::connect_lazy(connection_string)?;

    let mount_path = format!("/{}", settings.mount_path.trim_matches('/'));
    let addon = Self {
      inner: Arc::new(AddonInner {
        descriptor: settings.descriptor,
        mount_path,
        credentials: settings.credentials,
        max_token_age: settings
          .max_token_age
          .unwrap_or(Duration::from_secs(DEFAULT_MAX_TOKEN_AGE_SECS)),
        tenants,
        webhooks: RwLock::new(Vec::new()),
        handlers: RwLock::new(HashMap::new()),
      }),
    };

    match &settings.sub_app {
      Some(app) => app.mount(addon.mount_path(), addon.router()),
      None => warn!(
        key = %addon.key(),
        "No host web app supplied; add-on endpoints are not mounted"
      ),
    }

    info!(key = %addon.key(), mount_path = %addon.mount_path(), "Add-on created");
    Ok(addon)
  }

  pub fn key(&self) -> &str {
    &self.inner.descriptor.key
  }

  pub fn mount_path(&self) -> &str {
    &self.inner.mount_path
  }

  pub fn credentials(&self) -> &AddonCredentials {
    &self.inner.credentials
  }

  pub fn tenants(&self) -> &TenantStore {
    &self.inner.tenants
  }

  /// Register webhook subscriptions, appended in the given order.
  ///
  /// # Errors
  /// Returns [`AddonError::InvalidWebhook`] if any event name is empty or
  /// contains `/`; nothing is registered in that case.
  pub fn add_webhooks(&self, subscriptions: impl IntoIterator<Item = WebhookSubscription>) -> Result<(), AddonError> {
    let subscriptions: Vec<_> = subscriptions.into_iter().collect();
    for sub in &subscriptions {
      if sub.event.trim().is_empty() {
        return Err(AddonError::InvalidWebhook(format!("empty event name for path {:?}", sub.path)));
      }
      if sub.event.contains('/') {
        return Err(AddonError::InvalidWebhook(format!("event name {:?} contains '/'", sub.event)));
      }
    }

    let mut webhooks = self.inner.webhooks.write().unwrap_or_else(PoisonError::into_inner);
    for sub in subscriptions {
      debug!(event = %sub.event, path = %sub.path, "Registering webhook");
      webhooks.push(sub);
    }
    Ok(())
  }

  /// Registered subscriptions, in registration order.
  pub fn webhooks(&self) -> Vec<WebhookSubscription> {
    self.inner.webhooks.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Route deliveries for subscriptions with this `path` to `handler`,
  /// replacing any previous handler for the path.
  pub fn on_webhook(&self, path: impl Into<String>, handler: impl WebhookHandler + 'static) {
    let path = path.into();
    debug!(%path, "Registering webhook handler");
    self
      .inner
      .handlers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(path, Arc::new(handler));
  }

  /// The app descriptor reflecting the current subscriptions.
  pub fn descriptor(&self) -> Descriptor {
    Descriptor::build(&self.inner.descriptor, self.mount_path(), &self.webhooks())
  }

  /// Router serving the add-on endpoints, relative to the mount path.
  pub fn router(&self) -> Router {
    routes::router(self.clone())
  }

  /// Verify the JWT on an inbound request and return the tenant that sent it.
  ///
  /// `uri` is the request URI as received by the server (before any
  /// nesting strips the mount prefix).
  pub async fn authenticate(
    &self,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
  ) -> Result<(Tenant, ConnectClaims), AddonError> {
    let token =
      jwt::extract_token(headers, uri.query()).ok_or_else(|| AddonError::Unauthorized("missing JWT".to_string()))?;

    let client_key = jwt::unverified_issuer(&token)?;
    let tenant = self
      .tenants()
      .get(&client_key)
      .await?
      .ok_or_else(|| AddonError::UnknownTenant(client_key.clone()))?;

    let claims = jwt::verify(&token, &tenant.shared_secret, self.inner.max_token_age)?;

    let path = self.relative_path(uri.path());
    let expected = jwt::query_string_hash(method.as_str(), &path, uri.query());
    if claims.qsh.as_deref() != Some(expected.as_str()) {
      return Err(AddonError::Unauthorized(format!("query string hash mismatch for {path}")));
    }

    Ok((tenant, claims))
  }

  /// Deliver an event to the handlers of every matching subscription, in
  /// subscription order. Returns how many handlers ran.
  ///
  /// Every handler runs even if an earlier one fails; failures are reported
  /// together afterwards.
  pub async fn dispatch(
    &self,
    event: &str,
    client_key: &str,
    payload: serde_json::Value,
  ) -> Result<usize, AddonError> {
    let targets: Vec<(String, Arc<dyn WebhookHandler>)> = {
      let webhooks = self.inner.webhooks.read().unwrap_or_else(PoisonError::into_inner);
      let handlers = self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner);
      webhooks
        .iter()
        .filter(|sub| sub.event == event)
        .filter_map(|sub| handlers.get(&sub.path).map(|h| (sub.path.clone(), Arc::clone(h))))
        .collect()
    };

    if targets.is_empty() {
      debug!(event, client_key, "No handler registered for webhook");
      return Ok(0);
    }

    let mut failures = Vec::new();
    for (path, handler) in &targets {
      let delivery = WebhookEvent {
        event: event.to_string(),
        path: path.clone(),
        client_key: client_key.to_string(),
        payload: payload.clone(),
      };
      if let Err(e) = handler.handle(&delivery).await {
        warn!(event, %path, error = %e, "Webhook handler failed");
        failures.push(format!("{path}: {e:#}"));
      }
    }

    if !failures.is_empty() {
      return Err(AddonError::Handler(failures.join("; ")));
    }
    Ok(targets.len())
  }

  /// Request path relative to the descriptor's `baseUrl`, as used for `qsh`.
  fn relative_path(&self, request_path: &str) -> String {
    let base_path = url::Url::parse(&self.inner.descriptor.base_url)
      .map(|url| url.path().trim_end_matches('/').to_string())
      .unwrap_or_default();

    match request_path.strip_prefix(base_path.as_str()) {
      Some(rest) if !base_path.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest.to_string(),
      _ => request_path.to_string(),
    }
  }
}
