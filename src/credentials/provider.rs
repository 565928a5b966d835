//! Credential provider abstraction.

use super::{Credential, CredentialError};

/// A source of per-host credentials.
pub trait CredentialsProvider {
  /// Retrieves credentials for `host` (e.g. `example.atlassian.net`).
  ///
  /// # Returns
  /// * `Ok(Some(Credential))` when the provider has an entry for the host.
  /// * `Ok(None)` when it does not.
  ///
  /// # Errors
  /// Returns `Err(CredentialError)` when the backing store cannot be read.
  fn get_credentials(&self, host: &str) -> Result<Option<Credential>, CredentialError>;
}
