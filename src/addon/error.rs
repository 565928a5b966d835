//! Errors raised by the add-on host.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AddonError {
  /// The persistence connection string is not a usable SQLite URL.
  #[error("invalid connection string {value:?}: {reason}")]
  InvalidConnectionString { value: String, reason: String },
  #[error("invalid webhook subscription: {0}")]
  InvalidWebhook(String),
  #[error("tenant store error: {0}")]
  Database(#[from] sqlx::Error),
  #[error("unauthorized: {0}")]
  Unauthorized(String),
  #[error("unknown tenant {0:?}")]
  UnknownTenant(String),
  #[error("invalid payload: {0}")]
  InvalidPayload(String),
  /// One or more webhook handlers returned an error.
  #[error("webhook handler failed: {0}")]
  Handler(String),
}

impl AddonError {
  fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized(_) | Self::UnknownTenant(_) => StatusCode::UNAUTHORIZED,
      Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
      Self::InvalidConnectionString { .. } | Self::InvalidWebhook(_) | Self::Database(_) | Self::Handler(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for AddonError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "Add-on request failed");
    } else {
      warn!(error = %self, %status, "Add-on request rejected");
    }

    // Auth failures do not echo details back to the caller.
    let message = match &self {
      Self::Unauthorized(_) | Self::UnknownTenant(_) => "unauthorized".to_string(),
      other => other.to_string(),
    };

    (status, Json(json!({ "error": message }))).into_response()
  }
}
