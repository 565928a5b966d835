//! Credential value and error types.

use std::path::PathBuf;

/// Username and API token for one host.
///
/// For Atlassian Cloud the username is the account email and the password is
/// an API token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
  pub username: String,
  pub password: String,
}

/// Errors that can occur while looking up credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
  /// No home directory to look for `.netrc` in.
  #[error("cannot locate .netrc: HOME is not set")]
  HomeNotSet,
  /// A `machine` or `default` entry ended before its value.
  #[error("failed to parse {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
