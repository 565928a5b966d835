//! Installed-tenant persistence.
//!
//! Each Confluence site that installs the add-on sends a client key and a
//! shared secret; the secret is what inbound JWTs are verified against. Records
//! live in SQLite, either a file (`sqlite://tenants.db`) or memory
//! (`sqlite::memory:`).

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::AddonError;

/// Used when no connection string is configured.
pub const IN_MEMORY: &str = "sqlite::memory:";

type TenantRow = (String, String, String, Option<String>, i64);

/// One installation of the add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
  pub client_key: String,
  pub shared_secret: String,
  /// Base URL of the installing site.
  pub base_url: String,
  pub product_type: Option<String>,
  /// Unix timestamp of the latest install callback.
  pub installed_at: i64,
}

impl From<TenantRow> for Tenant {
  fn from((client_key, shared_secret, base_url, product_type, installed_at): TenantRow) -> Self {
    Self {
      client_key,
      shared_secret,
      base_url,
      product_type,
      installed_at,
    }
  }
}

#[derive(Clone)]
pub struct TenantStore {
  pool: SqlitePool,
  schema: Arc<OnceCell<()>>,
}

impl TenantStore {
  /// Parse `connection_string` and prepare a lazily connecting pool.
  ///
  /// No I/O happens here; a malformed string fails immediately, an
  /// unreachable database fails on first use.
  pub fn connect_lazy(connection_string: &str) -> Result<Self, AddonError> {
    let invalid = |reason: String| AddonError::InvalidConnectionString {
      value: connection_string.to_string(),
      reason,
    };

    if !connection_string.starts_with("sqlite:") {
      return Err(invalid("only sqlite: connection strings are supported".to_string()));
    }

    let options = SqliteConnectOptions::from_str(connection_string)
      .map_err(|e| invalid(e.to_string()))?
      .create_if_missing(true);

    // A single long-lived connection keeps an in-memory database alive and
    // spawns no maintenance tasks.
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .min_connections(0)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_lazy_with(options);

    debug!(connection_string, "Prepared tenant store");

    Ok(Self {
      pool,
      schema: Arc::new(OnceCell::new()),
    })
  }

  async fn pool(&self) -> Result<&SqlitePool, AddonError> {
    self
      .schema
      .get_or_try_init(|| async {
        sqlx::query(
          "CREATE TABLE IF NOT EXISTS addon_tenants (\
             client_key TEXT PRIMARY KEY, \
             shared_secret TEXT NOT NULL, \
             base_url TEXT NOT NULL, \
             product_type TEXT, \
             installed_at INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await
        .map(|_| ())
      })
      .await?;
    Ok(&self.pool)
  }

  /// Insert or replace the record for `tenant.client_key`.
  pub async fn save(&self, tenant: &Tenant) -> Result<(), AddonError> {
    let pool = self.pool().await?;
    sqlx::query(
      "INSERT INTO addon_tenants (client_key, shared_secret, base_url, product_type, installed_at) \
       VALUES (?1, ?2, ?3, ?4, ?5) \
       ON CONFLICT(client_key) DO UPDATE SET \
       shared_secret = excluded.shared_secret, base_url = excluded.base_url, \
       product_type = excluded.product_type, installed_at = excluded.installed_at",
    )
    .bind(&tenant.client_key)
    .bind(&tenant.shared_secret)
    .bind(&tenant.base_url)
    .bind(&tenant.product_type)
    .bind(tenant.installed_at)
    .execute(pool)
    .await?;

    info!(client_key = %tenant.client_key, base_url = %tenant.base_url, "Tenant saved");
    Ok(())
  }

  pub async fn get(&self, client_key: &str) -> Result<Option<Tenant>, AddonError> {
    let pool = self.pool().await?;
    let row: Option<TenantRow> = sqlx::query_as(
      "SELECT client_key, shared_secret, base_url, product_type, installed_at \
       FROM addon_tenants WHERE client_key = ?1",
    )
    .bind(client_key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Tenant::from))
  }

  /// Remove a tenant. Returns whether a record existed.
  pub async fn delete(&self, client_key: &str) -> Result<bool, AddonError> {
    let pool = self.pool().await?;
    let result = sqlx::query("DELETE FROM addon_tenants WHERE client_key = ?1")
      .bind(client_key)
      .execute(pool)
      .await?;
    let removed = result.rows_affected() > 0;
    if removed {
      info!(client_key, "Tenant removed");
    }
    Ok(removed)
  }

  /// All tenants, ordered by client key.
  pub async fn list(&self) -> Result<Vec<Tenant>, AddonError> {
    let pool = self.pool().await?;
    let rows: Vec<TenantRow> = sqlx::query_as(
      "SELECT client_key, shared_secret, base_url, product_type, installed_at \
       FROM addon_tenants ORDER BY client_key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Tenant::from).collect())
  }
}
