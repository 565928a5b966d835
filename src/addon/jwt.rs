//! Atlassian Connect JWT handling.
//!
//! Requests from the product carry `Authorization: JWT <token>` (or a `jwt`
//! query parameter). The token is HS256-signed with the tenant's shared
//! secret, its `iss` is the tenant's client key, and its `qsh` claim binds it
//! to one method, path, and query string.

use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::AddonError;

/// Claims carried by Connect JWTs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectClaims {
  /// Client key of the tenant (or the add-on key for outbound tokens).
  pub iss: String,
  pub iat: i64,
  pub exp: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub qsh: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub: Option<String>,
}

/// Pull the raw token from the `Authorization` header or the `jwt` query
/// parameter, header first.
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
  let from_header = headers
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("JWT "))
    .map(|token| token.trim().to_string());

  from_header.or_else(|| {
    query.and_then(|q| {
      url::form_urlencoded::parse(q.as_bytes())
        .find(|(key, _)| key == "jwt")
        .map(|(_, value)| value.into_owned())
    })
  })
}

/// Read `iss` without checking the signature, to find whose secret to verify
/// with.
pub fn unverified_issuer(token: &str) -> Result<String, AddonError> {
  let mut validation = Validation::new(Algorithm::HS256);
  validation.insecure_disable_signature_validation();
  validation.validate_exp = false;
  validation.required_spec_claims.clear();

  decode::<ConnectClaims>(token, &DecodingKey::from_secret(&[]), &validation)
    .map(|data| data.claims.iss)
    .map_err(|e| AddonError::Unauthorized(format!("malformed JWT: {e}")))
}

/// Verify signature, expiry, and age of a token.
pub fn verify(token: &str, shared_secret: &str, max_age: Duration) -> Result<ConnectClaims, AddonError> {
  let mut validation = Validation::new(Algorithm::HS256);
  validation.set_required_spec_claims(&["exp", "iss"]);

  let claims = decode::<ConnectClaims>(
    token,
    &DecodingKey::from_secret(shared_secret.as_bytes()),
    &validation,
  )
  .map_err(|e| AddonError::Unauthorized(format!("JWT verification failed: {e}")))?
  .claims;

  let age = Utc::now().timestamp() - claims.iat;
  if age > i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX) {
    return Err(AddonError::Unauthorized(format!("JWT issued {age}s ago exceeds max age")));
  }

  Ok(claims)
}

/// Sign claims with a shared secret.
pub fn sign(claims: &ConnectClaims, shared_secret: &str) -> Result<String, AddonError> {
  encode(
    &Header::new(Algorithm::HS256),
    claims,
    &EncodingKey::from_secret(shared_secret.as_bytes()),
  )
  .map_err(|e| AddonError::Unauthorized(format!("failed to sign JWT: {e}")))
}

/// Query string hash: hex SHA-256 of the canonical request
/// `METHOD&path&query`.
pub fn query_string_hash(method: &str, path: &str, query: Option<&str>) -> String {
  let canonical = canonical_request(method, path, query);
  format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

fn canonical_request(method: &str, path: &str, query: Option<&str>) -> String {
  format!(
    "{}&{}&{}",
    method.to_uppercase(),
    canonical_path(path),
    canonical_query(query.unwrap_or_default())
  )
}

fn canonical_path(path: &str) -> String {
  let trimmed = path.trim_end_matches('/');
  let path = if trimmed.is_empty() {
    "/".to_string()
  } else if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{trimmed}")
  };
  path.replace('&', "%26")
}

/// Parameters sorted by key, repeated keys joined with `,` after sorting
/// their values, `jwt` excluded.
fn canonical_query(query: &str) -> String {
  let mut params: Vec<(String, Vec<String>)> = Vec::new();
  for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
    if key == "jwt" {
      continue;
    }
    let key = percent_encode(&key);
    let value = percent_encode(&value);
    match params.iter_mut().find(|(existing, _)| *existing == key) {
      Some((_, values)) => values.push(value),
      None => params.push((key, vec![value])),
    }
  }

  params.sort_by(|a, b| a.0.cmp(&b.0));
  params
    .into_iter()
    .map(|(key, mut values)| {
      values.sort();
      format!("{key}={}", values.join(","))
    })
    .collect::<Vec<_>>()
    .join("&")
}

/// RFC 3986 unreserved characters pass through; everything else is `%XX`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

fn percent_encode(input: &str) -> String {
  utf8_percent_encode(input, QUERY_COMPONENT).to_string()
}
