//! Data transfer objects exchanged with the Confluence REST API.

use serde::{Deserialize, Serialize};

/// Confluence page (or blog post) metadata and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
  /// Unique numeric identifier assigned by Confluence.
  pub id: String,
  /// Human-readable title displayed in the UI.
  pub title: String,
  #[serde(rename = "type")]
  /// Content type (typically `"page"` or `"blogpost"`).
  pub page_type: String,
  /// Publication status such as `"current"` or `"draft"`.
  pub status: String,
  /// Body content, present when `body.storage` was expanded.
  #[serde(default)]
  pub body: Option<PageBody>,
  /// Version information, present when `version` was expanded.
  #[serde(default)]
  pub version: Option<PageVersion>,
  /// Space metadata describing where the page lives.
  #[serde(default)]
  pub space: Option<Space>,
  #[serde(rename = "_links", default)]
  pub links: Option<PageLinks>,
}

/// Page body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBody {
  pub storage: Option<StorageFormat>,
}

/// Storage format (Confluence's XHTML-based internal format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFormat {
  pub value: String,
  /// Representation name (always `"storage"` here).
  pub representation: String,
}

impl StorageFormat {
  pub fn new(value: impl Into<String>) -> Self {
    Self {
      value: value.into(),
      representation: "storage".to_string(),
    }
  }
}

/// Page version; updates must send `number + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVersion {
  pub number: u64,
}

/// Space information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
  /// Short key that uniquely identifies the space.
  pub key: String,
  pub name: String,
  #[serde(rename = "type")]
  /// Space classification such as `"global"` or `"personal"`.
  pub space_type: String,
}

/// Page links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLinks {
  #[serde(rename = "webui")]
  pub web_ui: Option<String>,
  #[serde(rename = "self")]
  pub self_link: Option<String>,
}

/// Paged list wrapper used by child-page and search responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentList {
  pub results: Vec<Page>,
  #[serde(default)]
  pub size: Option<usize>,
}

/// Payload for creating a page.
#[derive(Debug, Clone, Serialize)]
pub struct NewPage {
  #[serde(rename = "type")]
  pub page_type: String,
  pub title: String,
  pub space: SpaceRef,
  pub body: NewPageBody,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub ancestors: Vec<ContentRef>,
}

/// Payload for updating an existing page.
#[derive(Debug, Clone, Serialize)]
pub struct PageUpdate {
  #[serde(rename = "type")]
  pub page_type: String,
  pub title: String,
  pub body: NewPageBody,
  pub version: PageVersion,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceRef {
  pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentRef {
  pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPageBody {
  pub storage: StorageFormat,
}

/// User information for the authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
  #[serde(rename = "accountId")]
  /// Stable Atlassian account identifier.
  pub account_id: String,
  /// Primary email address if the API caller is permitted to view it.
  pub email: Option<String>,
  #[serde(rename = "displayName")]
  pub display_name: String,
  #[serde(rename = "publicName")]
  pub public_name: Option<String>,
}
