//! Trait definitions for interacting with Confluence.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Page, Space, UserInfo};

/// Trait for Confluence API operations (enables testing with fake
/// implementations).
#[async_trait]
pub trait ConfluenceApi: Send + Sync {
  /// Fetch a page by ID, with storage body, version, and space expanded.
  async fn get_page(&self, page_id: &str) -> Result<Page>;

  /// Direct children of a page.
  async fn get_child_pages(&self, page_id: &str) -> Result<Vec<Page>>;

  /// Fetch a space by key.
  async fn get_space(&self, space_key: &str) -> Result<Space>;

  /// Search content with a CQL query.
  ///
  /// # Arguments
  /// * `cql` - Confluence Query Language expression, e.g. `space = DOCS and type = page`.
  /// * `limit` - Maximum number of results to return.
  async fn search(&self, cql: &str, limit: usize) -> Result<Vec<Page>>;

  /// Create a page in a space, optionally under a parent page.
  ///
  /// # Arguments
  /// * `space_key` - Key of the space to create the page in.
  /// * `title` - Page title; must be unique within the space.
  /// * `storage_body` - Body in storage format.
  /// * `parent_id` - Parent page, or `None` for a top-level page.
  ///
  /// # Returns
  /// The created page as returned by Confluence.
  async fn create_page(&self, space_key: &str, title: &str, storage_body: &str, parent_id: Option<&str>)
  -> Result<Page>;

  /// Replace the title and body of a page.
  ///
  /// `version` is the new version number (current version + 1).
  async fn update_page(&self, page_id: &str, title: &str, storage_body: &str, version: u64) -> Result<Page>;

  /// The authenticated user, confirming credentials are valid.
  async fn current_user(&self) -> Result<UserInfo>;
}
