//! Inbound webhook events and the handlers they are routed to.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A webhook delivery, after authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
  /// Event name from the receiver URL, e.g. `page_created`.
  pub event: String,
  /// Path of the subscription this delivery is routed to.
  pub path: String,
  /// Client key of the tenant that sent it.
  pub client_key: String,
  /// Request body; `Null` when the subscription excludes the body.
  pub payload: serde_json::Value,
}

/// Receives webhook events for one subscription path.
///
/// Async closures taking a [`WebhookEvent`] implement this trait.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
  async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> WebhookHandler for F
where
  F: Fn(WebhookEvent) -> Fut + Send + Sync,
  Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
  async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
    (self)(event.clone()).await
  }
}
