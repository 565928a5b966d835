//! HTTP endpoints of the add-on.

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use super::{AddonError, AtlassianAddon, Descriptor, Tenant};

pub(super) fn router(addon: AtlassianAddon) -> Router {
  Router::new()
    .route("/addon", get(descriptor))
    .route("/installed", post(installed))
    .route("/uninstalled", post(uninstalled))
    .route("/webhooks/:event", post(webhook))
    .with_state(addon)
}

/// Body of the `installed` lifecycle callback. Unused fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallPayload {
  client_key: String,
  shared_secret: String,
  base_url: String,
  #[serde(default)]
  product_type: Option<String>,
}

async fn descriptor(State(addon): State<AtlassianAddon>) -> Json<Descriptor> {
  Json(addon.descriptor())
}

async fn installed(
  State(addon): State<AtlassianAddon>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
  body: Bytes,
) -> Result<StatusCode, AddonError> {
  let payload: InstallPayload =
    serde_json::from_slice(&body).map_err(|e| AddonError::InvalidPayload(e.to_string()))?;

  if payload.client_key.is_empty() || payload.shared_secret.is_empty() {
    return Err(AddonError::InvalidPayload(
      "clientKey and sharedSecret are required".to_string(),
    ));
  }

  // A known tenant may only be overwritten by a request signed with the
  // secret we already hold for it.
  if addon.tenants().get(&payload.client_key).await?.is_some() {
    let (tenant, _) = addon.authenticate(&method, &uri, &headers).await?;
    if tenant.client_key != payload.client_key {
      return Err(AddonError::Unauthorized(format!(
        "tenant {} cannot reinstall {}",
        tenant.client_key, payload.client_key
      )));
    }
    debug!(client_key = %payload.client_key, "Reinstall authenticated");
  }

  addon
    .tenants()
    .save(&Tenant {
      client_key: payload.client_key,
      shared_secret: payload.shared_secret,
      base_url: payload.base_url,
      product_type: payload.product_type,
      installed_at: Utc::now().timestamp(),
    })
    .await?;

  Ok(StatusCode::NO_CONTENT)
}

async fn uninstalled(
  State(addon): State<AtlassianAddon>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
) -> Result<StatusCode, AddonError> {
  let (tenant, _) = addon.authenticate(&method, &uri, &headers).await?;
  addon.tenants().delete(&tenant.client_key).await?;
  info!(client_key = %tenant.client_key, "Add-on uninstalled");
  Ok(StatusCode::NO_CONTENT)
}

async fn webhook(
  State(addon): State<AtlassianAddon>,
  Path(event): Path<String>,
  method: Method,
  OriginalUri(uri): OriginalUri,
  headers: HeaderMap,
  body: Bytes,
) -> Result<StatusCode, AddonError> {
  let (tenant, _) = addon.authenticate(&method, &uri, &headers).await?;

  let payload = if body.is_empty() {
    serde_json::Value::Null
  } else {
    serde_json::from_slice(&body).map_err(|e| AddonError::InvalidPayload(e.to_string()))?
  };

  let handled = addon.dispatch(&event, &tenant.client_key, payload).await?;
  debug!(%event, client_key = %tenant.client_key, handled, "Webhook delivered");
  Ok(StatusCode::NO_CONTENT)
}
