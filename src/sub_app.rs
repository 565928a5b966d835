//! Host web application handle.
//!
//! A [`SubApp`] collects routers mounted by path. The add-on mounts itself
//! here during `connect()`; the host turns the collection into one axum
//! [`Router`] when it starts serving. Clones share the same mount table.

use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use tracing::debug;

#[derive(Clone, Default)]
pub struct SubApp {
  mounts: Arc<Mutex<Vec<(String, Router)>>>,
}

impl std::fmt::Debug for SubApp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SubApp")
      .field("mounts", &self.mounted_paths())
      .finish()
  }
}

impl SubApp {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mount `router` under `path`, replacing whatever was mounted there.
  pub fn mount(&self, path: &str, router: Router) {
    let path = normalize_path(path);
    let mut mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(slot) = mounts.iter_mut().find(|(existing, _)| *existing == path) {
      debug!(%path, "Replacing mounted router");
      slot.1 = router;
    } else {
      debug!(%path, "Mounting router");
      mounts.push((path, router));
    }
  }

  /// Paths currently mounted, in mount order.
  pub fn mounted_paths(&self) -> Vec<String> {
    self
      .mounts
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(path, _)| path.clone())
      .collect()
  }

  /// One router with every mount nested under its path.
  pub fn router(&self) -> Router {
    let mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
    mounts
      .iter()
      .fold(Router::new(), |app, (path, router)| {
        if path == "/" {
          app.merge(router.clone())
        } else {
          app.nest(path, router.clone())
        }
      })
  }
}

/// Leading slash, no trailing slash.
fn normalize_path(path: &str) -> String {
  let trimmed = path.trim().trim_matches('/');
  format!("/{trimmed}")
}
