//! Fake Confluence API client for testing
//!
//! Keeps pages in memory and mimics the REST API's version rules, without
//! making any network requests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use confluence_connect::confluence::{
  ConfluenceApi, Page, PageBody, PageVersion, Space, StorageFormat, UserInfo,
};

use crate::common::fixtures;

#[derive(Default)]
struct State {
  pages: BTreeMap<String, Page>,
  parents: BTreeMap<String, String>,
  next_id: u64,
}

/// A fake Confluence client backed by an in-memory page map.
pub struct FakeConfluenceClient {
  state: Mutex<State>,
  spaces: BTreeMap<String, Space>,
  auth_should_succeed: bool,
}

impl FakeConfluenceClient {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(State {
        next_id: 900_000,
        ..State::default()
      }),
      spaces: BTreeMap::new(),
      auth_should_succeed: true,
    }
  }

  /// A client with the DOCS space, one page, and one child page.
  pub fn with_sample_pages() -> Self {
    let mut client = Self::new();
    if let Ok(space) = serde_json::from_value::<Space>(fixtures::sample_space_response()) {
      client.spaces.insert(space.key.clone(), space);
    }
    client.add_page_from_json(fixtures::sample_page_response(), None);
    client.add_page_from_json(fixtures::sample_child_page_response(), Some("123456"));
    client
  }

  pub fn add_page_from_json(&mut self, json: serde_json::Value, parent_id: Option<&str>) {
    if let Ok(page) = serde_json::from_value::<Page>(json) {
      let state = self.state.get_mut().unwrap();
      if let Some(parent) = parent_id {
        state.parents.insert(page.id.clone(), parent.to_string());
      }
      state.pages.insert(page.id.clone(), page);
    }
  }

  pub fn set_auth_success(&mut self, should_succeed: bool) {
    self.auth_should_succeed = should_succeed;
  }

  fn space(&self, key: &str) -> Result<Space> {
    self
      .spaces
      .get(key)
      .cloned()
      .ok_or_else(|| anyhow!("Confluence API returned error 404 Not Found for space: {key}"))
  }
}

impl Default for FakeConfluenceClient {
  fn default() -> Self {
    Self::new()
  }
}

fn storage_body(page: &Page) -> &str {
  page
    .body
    .as_ref()
    .and_then(|body| body.storage.as_ref())
    .map(|storage| storage.value.as_str())
    .unwrap_or_default()
}

/// First double-quoted term of a CQL expression, e.g. `text ~ "install"`.
fn quoted_term(cql: &str) -> Option<&str> {
  let start = cql.find('"')? + 1;
  let len = cql[start..].find('"')?;
  Some(&cql[start..start + len])
}

#[async_trait]
impl ConfluenceApi for FakeConfluenceClient {
  async fn get_page(&self, page_id: &str) -> Result<Page> {
    self
      .state
      .lock()
      .unwrap()
      .pages
      .get(page_id)
      .cloned()
      .ok_or_else(|| anyhow!("No content found with id: {page_id}"))
  }

  async fn get_child_pages(&self, page_id: &str) -> Result<Vec<Page>> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .parents
        .iter()
        .filter(|(_, parent)| parent.as_str() == page_id)
        .filter_map(|(child, _)| state.pages.get(child).cloned())
        .collect(),
    )
  }

  async fn get_space(&self, space_key: &str) -> Result<Space> {
    self.space(space_key)
  }

  async fn search(&self, cql: &str, limit: usize) -> Result<Vec<Page>> {
    let term = quoted_term(cql).map(str::to_lowercase);
    let state = self.state.lock().unwrap();
    Ok(
      state
        .pages
        .values()
        .filter(|page| match &term {
          Some(term) => {
            page.title.to_lowercase().contains(term) || storage_body(page).to_lowercase().contains(term)
          }
          None => true,
        })
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn create_page(
    &self,
    space_key: &str,
    title: &str,
    storage_body: &str,
    parent_id: Option<&str>,
  ) -> Result<Page> {
    let space = self.space(space_key)?;
    let mut state = self.state.lock().unwrap();

    if state
      .pages
      .values()
      .any(|page| page.title == title && page.space.as_ref().is_some_and(|s| s.key == space_key))
    {
      bail!("Confluence API returned error 400 Bad Request for create page: title {title:?} already exists");
    }
    if let Some(parent) = parent_id
      && !state.pages.contains_key(parent)
    {
      bail!("Confluence API returned error 404 Not Found for create page: parent {parent}");
    }

    state.next_id += 1;
    let page = Page {
      id: state.next_id.to_string(),
      title: title.to_string(),
      page_type: "page".to_string(),
      status: "current".to_string(),
      body: Some(PageBody {
        storage: Some(StorageFormat::new(storage_body)),
      }),
      version: Some(PageVersion { number: 1 }),
      space: Some(space),
      links: None,
    };

    if let Some(parent) = parent_id {
      state.parents.insert(page.id.clone(), parent.to_string());
    }
    state.pages.insert(page.id.clone(), page.clone());
    Ok(page)
  }

  async fn update_page(&self, page_id: &str, title: &str, storage_body: &str, version: u64) -> Result<Page> {
    let mut state = self.state.lock().unwrap();
    let page = state
      .pages
      .get_mut(page_id)
      .ok_or_else(|| anyhow!("No content found with id: {page_id}"))?;

    let current = page.version.as_ref().map(|v| v.number).unwrap_or(0);
    if version != current + 1 {
      bail!("Confluence API returned error 409 Conflict for update page: version {version} after {current}");
    }

    page.title = title.to_string();
    page.body = Some(PageBody {
      storage: Some(StorageFormat::new(storage_body)),
    });
    page.version = Some(PageVersion { number: version });
    Ok(page.clone())
  }

  async fn current_user(&self) -> Result<UserInfo> {
    if self.auth_should_succeed {
      Ok(serde_json::from_value(fixtures::sample_user_response())?)
    } else {
      Err(anyhow!("Authentication failed: Confluence API returned error 401 Unauthorized"))
    }
  }
}
