//! Authentication subcommand handlers.
//!
//! `confluence-connect auth test` connects with the effective configuration
//! and performs a live `current_user` call.

use std::process;

use super::load_config;
use crate::cli::{AuthCommand, Cli};
use crate::color::ColorScheme;
use crate::confluence::ConfluenceApi;
use crate::connection::ConfluenceConnection;

/// Dispatch the authentication subcommands defined under
/// `confluence-connect auth`.
///
/// # Arguments
/// * `subcommand` - Auth-specific variant to execute.
/// * `cli` - Parsed CLI settings carrying the config path and overrides.
/// * `colors` - Shared color scheme used to render output consistently.
pub(crate) async fn handle_auth_command(subcommand: &AuthCommand, cli: &Cli, colors: &ColorScheme) {
  match subcommand {
    AuthCommand::Test => test_auth(cli, colors).await,
  }
}

async fn test_auth(cli: &Cli, colors: &ColorScheme) {
  let config = match load_config(cli) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{} {}", colors.error("✗"), colors.error("Failed to load configuration"));
      eprintln!("  {e:#}");
      process::exit(1);
    }
  };

  println!("{} {}", colors.info("→"), colors.info("Testing authentication"));
  println!("  {}: {}", colors.emphasis("URL"), colors.link(&config.connection.host));
  if config.connection.username.is_empty() {
    println!("  {}: {}", colors.emphasis("Username"), colors.dimmed("(not set)"));
  } else {
    println!("  {}: {}", colors.emphasis("Username"), config.connection.username);
  }

  let mut connection = ConfluenceConnection::new(config, None);
  if let Err(e) = connection.connect() {
    eprintln!("\n{} {}", colors.error("✗"), colors.error("Failed to connect"));
    eprintln!("  {e}");
    process::exit(1);
  }

  let Some(api) = connection.api() else {
    eprintln!("\n{} {}", colors.error("✗"), colors.error("No API client after connect"));
    process::exit(1);
  };

  println!("\n{} {}", colors.info("→"), colors.info("Calling Confluence API..."));
  match api.current_user().await {
    Ok(user_info) => {
      println!(
        "\n{} {}",
        colors.success("✓"),
        colors.success("Authentication successful!")
      );
      println!("\n{}", colors.emphasis("User Information:"));
      println!("  {}: {}", colors.emphasis("Display Name"), user_info.display_name);
      println!(
        "  {}: {}",
        colors.emphasis("Account ID"),
        colors.dimmed(&user_info.account_id)
      );
      if let Some(email) = user_info.email {
        println!("  {}: {}", colors.emphasis("Email"), email);
      }
    }
    Err(e) => {
      eprintln!("\n{} {}", colors.error("✗"), colors.error("Authentication failed"));
      eprintln!("  {e:#}");
      eprintln!("\n{}", colors.info("Common issues:"));
      eprintln!(
        "  1. Invalid API token - verify at {}",
        colors.link("https://id.atlassian.com/manage-profile/security/api-tokens")
      );
      eprintln!("  2. Incorrect username - should be your email address");
      eprintln!("  3. Wrong host - should be https://your-instance.atlassian.net");
      process::exit(2);
    }
  }

  connection.disconnect();
}
