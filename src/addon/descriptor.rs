//! Atlassian Connect app descriptor.
//!
//! The descriptor is the JSON document the product fetches when the add-on is
//! installed. Only the parts this crate serves are modeled: identity,
//! authentication, lifecycle callbacks, and webhook modules. See
//! <https://developer.atlassian.com/cloud/confluence/app-descriptor/>.

use serde::{Deserialize, Serialize};

use crate::config::{Vendor, WebhookSubscription};

/// How the product authenticates requests to the add-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationType {
  Jwt,
  None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authentication {
  #[serde(rename = "type")]
  pub auth_type: AuthenticationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifecycle {
  pub installed: String,
  pub uninstalled: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookModule {
  pub event: String,
  /// Receiver URL, relative to the descriptor's `baseUrl`.
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exclude_body: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Modules {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub webhooks: Vec<WebhookModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
  pub key: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vendor: Option<Vendor>,
  pub base_url: String,
  pub authentication: Authentication,
  pub api_version: u32,
  pub scopes: Vec<String>,
  pub lifecycle: Lifecycle,
  pub modules: Modules,
}

/// Identity fields supplied by the connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
  pub key: String,
  pub name: String,
  pub description: Option<String>,
  pub vendor: Option<Vendor>,
  pub base_url: String,
  pub authentication: AuthenticationType,
}

impl Descriptor {
  /// Build the descriptor for an add-on mounted at `mount_path`.
  pub fn build(info: &DescriptorInfo, mount_path: &str, webhooks: &[WebhookSubscription]) -> Self {
    Self {
      key: info.key.clone(),
      name: info.name.clone(),
      description: info.description.clone(),
      vendor: info.vendor.clone(),
      base_url: info.base_url.clone(),
      authentication: Authentication {
        auth_type: info.authentication,
      },
      api_version: 1,
      scopes: vec!["READ".to_string()],
      lifecycle: Lifecycle {
        installed: format!("{mount_path}/installed"),
        uninstalled: format!("{mount_path}/uninstalled"),
      },
      modules: Modules {
        webhooks: webhooks
          .iter()
          .map(|sub| WebhookModule {
            event: sub.event.clone(),
            url: format!("{mount_path}/webhooks/{}", sub.event),
            filter: sub.filter.clone(),
            exclude_body: sub.exclude_body,
          })
          .collect(),
      },
    }
  }
}
