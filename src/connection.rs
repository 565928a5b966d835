//! The Confluence connection.
//!
//! [`ConfluenceConnection`] owns the REST client and, when the configuration
//! names an add-on, the [`AtlassianAddon`] that lets Confluence call back into
//! the host application. In add-on mode the endpoints are:
//!
//! ```text
//! GET  {baseUrl}/jira/addon/addon               descriptor
//! POST {baseUrl}/jira/addon/webhooks/{event}    webhook receiver
//! ```

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::addon::{AddonCredentials, AddonError, AddonSettings, AtlassianAddon, AuthenticationType, DescriptorInfo};
use crate::config::ConfluenceConfig;
use crate::confluence::ConfluenceClient;
use crate::sub_app::SubApp;

/// Mount path of the add-on endpoints on the host web app.
pub const ADDON_MOUNT_PATH: &str = "/jira/addon";

/// Errors raised by [`ConfluenceConnection::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
  #[error("failed to create Confluence client: {0:#}")]
  Client(anyhow::Error),
  #[error("failed to set up add-on: {0}")]
  Addon(#[from] AddonError),
}

#[derive(Debug)]
pub struct ConfluenceConnection {
  config: ConfluenceConfig,
  sub_app: Option<SubApp>,
  api: Option<ConfluenceClient>,
  addon: Option<AtlassianAddon>,
}

impl ConfluenceConnection {
  /// Create an unconnected adapter.
  ///
  /// # Arguments
  /// * `config` - Connection parameters and optional add-on settings.
  /// * `sub_app` - Host web app the add-on mounts its endpoints on. Only
  ///   consulted in add-on mode.
  pub fn new(config: ConfluenceConfig, sub_app: Option<SubApp>) -> Self {
    Self {
      config,
      sub_app,
      api: None,
      addon: None,
    }
  }

  /// Connector name.
  pub fn name(&self) -> &'static str {
    "Confluence"
  }

  pub fn config(&self) -> &ConfluenceConfig {
    &self.config
  }

  /// The REST client; `None` before [`connect`](Self::connect) and after
  /// [`disconnect`](Self::disconnect).
  pub fn api(&self) -> Option<&ConfluenceClient> {
    self.api.as_ref()
  }

  /// The add-on, if add-on mode is configured and `connect()` has run.
  pub fn addon(&self) -> Option<&AtlassianAddon> {
    self.addon.as_ref()
  }

  /// Create the REST client and, when configured, the add-on.
  ///
  /// Calling this again replaces both. Errors are not rolled back: a failed
  /// add-on setup leaves the freshly created client in place, and a rejected
  /// webhook batch leaves the already-mounted add-on reachable via
  /// [`addon`](Self::addon).
  ///
  /// # Errors
  /// [`ConnectError::Client`] when the client cannot be built,
  /// [`ConnectError::Addon`] when the add-on rejects its settings.
  pub fn connect(&mut self) -> Result<&mut Self, ConnectError> {
    let client = ConfluenceClient::from_connection(&self.config.connection).map_err(ConnectError::Client)?;
    self.api = Some(client);
    info!(host = %self.config.connection.host, "Connected to Confluence");

    self.setup_addon()?;

    Ok(self)
  }

  /// Drop the REST client. Always returns `true`, connected or not.
  ///
  /// The add-on stays mounted; its endpoints keep answering with the tenant
  /// data they already hold.
  pub fn disconnect(&mut self) -> bool {
    if self.api.take().is_some() {
      info!(host = %self.config.connection.host, "Disconnected from Confluence");
    }
    true
  }

  /// Build the add-on from the configuration and register its webhooks.
  ///
  /// Does nothing unless the add-on block has both a key and a name.
  pub fn setup_addon(&mut self) -> Result<(), ConnectError> {
    let Some(addon_info) = self.config.addon.as_ref() else {
      debug!("No add-on configured");
      return Ok(());
    };
    let Some((key, name)) = addon_info.identity() else {
      debug!("Add-on block has no key/name; skipping add-on setup");
      return Ok(());
    };

    let base_url = match self.config.base_url.as_deref() {
      Some(url) => url.trim_end_matches('/').to_string(),
      None => {
        warn!(%key, "No baseUrl configured; the descriptor will advertise an empty base URL");
        String::new()
      }
    };

    let connection = &self.config.connection;
    let settings = AddonSettings {
      descriptor: DescriptorInfo {
        key: key.to_string(),
        name: name.to_string(),
        description: addon_info.description.clone(),
        vendor: addon_info.vendor.clone(),
        base_url,
        authentication: AuthenticationType::Jwt,
      },
      sub_app: self.sub_app.clone(),
      mount_path: ADDON_MOUNT_PATH.to_string(),
      connection_string: self.config.connection_string.clone(),
      max_token_age: Some(Duration::from_secs(self.config.max_token_age_secs())),
      credentials: AddonCredentials {
        api_token: connection.api_token.clone(),
        username: connection.username.clone(),
        host: connection.host.clone(),
      },
    };

    // Held before webhook registration; `new` has already mounted it.
    let addon = self.addon.insert(AtlassianAddon::new(settings)?);

    if !self.config.webhooks.is_empty() {
      addon.add_webhooks(self.config.webhooks.iter().cloned())?;
      info!(count = self.config.webhooks.len(), "Registered webhooks");
    }

    Ok(())
  }
}
