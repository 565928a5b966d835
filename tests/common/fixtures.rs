//! Sample Confluence REST responses and connection configs.

use confluence_connect::{AddonInfo, ConfluenceConfig, ConnectionInfo, WebhookSubscription};
use serde_json::json;

pub const HOST: &str = "https://x.atlassian.net";

/// A plain client configuration against [`HOST`].
pub fn plain_config() -> ConfluenceConfig {
  ConfluenceConfig::new(ConnectionInfo::new(HOST, "u", "t"))
}

/// An add-on configuration with two webhook subscriptions.
pub fn addon_config() -> ConfluenceConfig {
  let mut config = plain_config();
  config.addon = Some(AddonInfo::new("com.example.bot", "Example Bot"));
  config.base_url = Some("https://bots.example.com".to_string());
  config.webhooks = vec![
    WebhookSubscription::new("page_created", "/a"),
    WebhookSubscription::new("page_removed", "/b"),
  ];
  config
}

pub fn sample_page_response() -> serde_json::Value {
  json!({
    "id": "123456",
    "type": "page",
    "status": "current",
    "title": "Getting Started Guide",
    "body": {
      "storage": {
        "value": "<h1>Getting Started</h1><p>Welcome to our documentation!</p>",
        "representation": "storage"
      }
    },
    "version": { "number": 3 },
    "space": {
      "key": "DOCS",
      "name": "Documentation",
      "type": "global"
    },
    "_links": {
      "webui": "/wiki/spaces/DOCS/pages/123456/Getting+Started+Guide",
      "self": "https://x.atlassian.net/wiki/rest/api/content/123456"
    }
  })
}

pub fn sample_child_page_response() -> serde_json::Value {
  json!({
    "id": "123457",
    "type": "page",
    "status": "current",
    "title": "Installation",
    "version": { "number": 1 },
    "space": {
      "key": "DOCS",
      "name": "Documentation",
      "type": "global"
    }
  })
}

pub fn sample_space_response() -> serde_json::Value {
  json!({
    "key": "DOCS",
    "name": "Documentation",
    "type": "global"
  })
}

pub fn sample_user_response() -> serde_json::Value {
  json!({
    "accountId": "5b10ac8d82e05b22cc7d4ef5",
    "email": "u@example.com",
    "displayName": "Test User",
    "publicName": "tuser"
  })
}

/// The `installed` lifecycle payload Confluence sends.
pub fn install_payload(client_key: &str, shared_secret: &str) -> serde_json::Value {
  json!({
    "key": "com.example.bot",
    "clientKey": client_key,
    "sharedSecret": shared_secret,
    "baseUrl": "https://x.atlassian.net/wiki",
    "productType": "confluence",
    "eventType": "installed"
  })
}
