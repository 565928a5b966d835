//! HTTP client implementation for talking to the Confluence REST API.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, trace};

use super::api::ConfluenceApi;
use super::models::{
  ContentList, ContentRef, NewPage, NewPageBody, Page, PageUpdate, PageVersion, Space, SpaceRef, StorageFormat,
  UserInfo,
};
use crate::config::ConnectionInfo;

/// Confluence API client.
#[derive(Clone)]
pub struct ConfluenceClient {
  base_url: String,
  username: String,
  token: String,
  client: reqwest::Client,
  rate_limiter: Arc<RequestRateLimiter>,
}

impl std::fmt::Debug for ConfluenceClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConfluenceClient")
      .field("base_url", &self.base_url)
      .field("username", &self.username)
      .finish_non_exhaustive()
  }
}

/// Simple fixed-window rate limiter to cap the number of requests per interval.
#[derive(Debug)]
struct RequestRateLimiter {
  max_requests: usize,
  window: Duration,
  timestamps: Mutex<VecDeque<Instant>>,
}

impl RequestRateLimiter {
  fn new(max_requests: usize, window: Duration) -> Self {
    Self {
      max_requests,
      window,
      timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
    }
  }

  /// Wait until the caller can perform another request without exceeding the
  /// rate limit.
  async fn acquire(&self) {
    loop {
      let mut timestamps = self.timestamps.lock().await;
      let now = Instant::now();

      while let Some(earliest) = timestamps.front()
        && now.duration_since(*earliest) >= self.window
      {
        timestamps.pop_front();
      }

      if timestamps.len() < self.max_requests {
        timestamps.push_back(now);
        return;
      }

      let wait_duration = match timestamps.front() {
        Some(earliest) => self.window.saturating_sub(now.duration_since(*earliest)),
        None => Duration::ZERO,
      };

      drop(timestamps);

      if !wait_duration.is_zero() {
        trace!(?wait_duration, "Rate limit reached, waiting");
        sleep(wait_duration).await;
      }
    }
  }
}

impl ConfluenceClient {
  /// Create a new Confluence client.
  ///
  /// # Arguments
  /// * `base_url` - The base URL of the Confluence instance (e.g., https://example.atlassian.net)
  /// * `username` - The user's email address
  /// * `token` - The API token
  /// * `timeout_secs` - Request timeout in seconds
  /// * `rate_limit` - Maximum requests per second
  ///
  /// # Errors
  /// Returns an error if the rate limit is zero or if the underlying
  /// `reqwest::Client` cannot be built.
  pub fn new(
    base_url: impl Into<String>,
    username: impl Into<String>,
    token: impl Into<String>,
    timeout_secs: u64,
    rate_limit: usize,
  ) -> Result<Self> {
    let base_url = base_url.into();
    let username = username.into();
    let token = token.into();

    if rate_limit == 0 {
      return Err(anyhow!("Rate limit must be at least 1 request per second"));
    }

    let base_url = base_url.trim_end_matches('/').to_string();
    if base_url.is_empty() {
      return Err(anyhow!("Confluence host must not be empty"));
    }

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(format!(
        "confluence-connect/{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("TARGET")
      ))
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self {
      base_url,
      username,
      token,
      client,
      rate_limiter: Arc::new(RequestRateLimiter::new(rate_limit, Duration::from_secs(1))),
    })
  }

  /// Create a client from configured connection parameters.
  pub fn from_connection(connection: &ConnectionInfo) -> Result<Self> {
    Self::new(
      &connection.host,
      &connection.username,
      &connection.api_token,
      connection.timeout_secs,
      connection.rate_limit,
    )
  }

  /// Base URL requests are issued against, without a trailing slash.
  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Get the authorization header value (Basic auth).
  fn auth_header(&self) -> String {
    let credentials = format!("{}:{}", self.username, self.token);
    format!("Basic {}", BASE64.encode(credentials.as_bytes()))
  }

  /// REST endpoint URL under `/wiki/rest/api`. Each segment is
  /// percent-encoded, so ids and keys cannot alter the path or query.
  fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(&self.base_url)
      .with_context(|| format!("Invalid Confluence host URL: {}", self.base_url))?;
    url
      .path_segments_mut()
      .map_err(|()| anyhow!("Confluence host URL cannot carry a path: {}", self.base_url))?
      .pop_if_empty()
      .extend(["wiki", "rest", "api"])
      .extend(segments);
    Ok(url)
  }

  /// Send a request and decode the JSON response, turning non-2xx statuses
  /// into errors that carry the response body.
  async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, what: &str) -> Result<T> {
    self.rate_limiter.acquire().await;

    let response = request
      .header("Authorization", self.auth_header())
      .header("Accept", "application/json")
      .send()
      .await
      .with_context(|| format!("Failed to send {what} request to Confluence API"))?;

    let status = response.status();
    debug!(%status, what, "Confluence API response");

    if !status.is_success() {
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      return Err(anyhow!("Confluence API returned error {status} for {what}: {error_text}"));
    }

    response
      .json()
      .await
      .with_context(|| format!("Failed to parse {what} response from Confluence API"))
  }
}

#[async_trait]
impl ConfluenceApi for ConfluenceClient {
  async fn get_page(&self, page_id: &str) -> Result<Page> {
    let request = self
      .client
      .get(self.url(&["content", page_id])?)
      .query(&[("expand", "body.storage,version,space")]);
    self.send(request, "page").await
  }

  async fn get_child_pages(&self, page_id: &str) -> Result<Vec<Page>> {
    let request = self.client.get(self.url(&["content", page_id, "child", "page"])?);
    let children: ContentList = self.send(request, "child pages").await?;
    Ok(children.results)
  }

  async fn get_space(&self, space_key: &str) -> Result<Space> {
    let request = self.client.get(self.url(&["space", space_key])?);
    self.send(request, "space").await
  }

  async fn search(&self, cql: &str, limit: usize) -> Result<Vec<Page>> {
    let request = self
      .client
      .get(self.url(&["content", "search"])?)
      .query(&[("cql", cql.to_string()), ("limit", limit.to_string())]);
    let found: ContentList = self.send(request, "search").await?;
    Ok(found.results)
  }

  async fn create_page(
    &self,
    space_key: &str,
    title: &str,
    storage_body: &str,
    parent_id: Option<&str>,
  ) -> Result<Page> {
    let payload = NewPage {
      page_type: "page".to_string(),
      title: title.to_string(),
      space: SpaceRef {
        key: space_key.to_string(),
      },
      body: NewPageBody {
        storage: StorageFormat::new(storage_body),
      },
      ancestors: parent_id
        .map(|id| vec![ContentRef { id: id.to_string() }])
        .unwrap_or_default(),
    };

    let request = self.client.post(self.url(&["content"])?).json(&payload);
    self.send(request, "create page").await
  }

  async fn update_page(&self, page_id: &str, title: &str, storage_body: &str, version: u64) -> Result<Page> {
    let payload = PageUpdate {
      page_type: "page".to_string(),
      title: title.to_string(),
      body: NewPageBody {
        storage: StorageFormat::new(storage_body),
      },
      version: PageVersion { number: version },
    };

    let request = self.client.put(self.url(&["content", page_id])?).json(&payload);
    self.send(request, "update page").await
  }

  async fn current_user(&self) -> Result<UserInfo> {
    let request = self.client.get(self.url(&["user", "current"])?);
    self
      .send(request, "current user")
      .await
      .context("Authentication failed")
  }
}
