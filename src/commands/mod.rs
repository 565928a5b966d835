//! CLI subcommand handlers.
//!
//! Each `confluence-connect` subcommand lives in its own module; the helpers
//! here turn the parsed CLI into a [`ConfluenceConfig`] they all share.

pub mod auth;
pub mod completions;
pub mod descriptor;
pub mod serve;
pub mod version;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::{ConfluenceConfig, ConnectionInfo};
use crate::credentials::NetrcProvider;

/// Build the effective configuration for a command.
///
/// The config file (if any) is the base; `--url`, `--user` and `--token`
/// override it, and `.netrc` fills whatever credentials are still missing.
///
/// # Errors
/// Returns an error when the config file cannot be read or parsed, when
/// neither a file nor `--url` names a host, or when `.netrc` is malformed.
pub(crate) fn load_config(cli: &Cli) -> Result<ConfluenceConfig> {
  let mut config = match &cli.config {
    Some(path) => ConfluenceConfig::from_file(path)?,
    None => {
      let host = cli
        .auth
        .url
        .as_deref()
        .context("No Confluence host configured; pass --config or --url")?;
      ConfluenceConfig::new(ConnectionInfo::new(host, "", ""))
    }
  };

  config.apply_overrides(
    cli.auth.url.as_deref(),
    cli.auth.user.as_deref(),
    cli.auth.token.as_deref(),
  );
  config.resolve_credentials(&NetrcProvider::new())?;

  Ok(config)
}
