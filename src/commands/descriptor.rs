//! `confluence-connect descriptor`: print the add-on descriptor that `serve`
//! would publish at `{baseUrl}/jira/addon/addon`.

use std::process;

use super::load_config;
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::connection::ConfluenceConnection;
use crate::sub_app::SubApp;

pub(crate) fn handle_descriptor_command(cli: &Cli, colors: &ColorScheme) {
  let config = match load_config(cli) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{} {e:#}", colors.error("Error:"));
      process::exit(1);
    }
  };

  if config.addon_identity().is_none() {
    eprintln!(
      "{} configuration has no add-on (both {} and {} are required)",
      colors.error("Error:"),
      colors.code("addon.key"),
      colors.code("addon.name")
    );
    process::exit(1);
  }

  let mut connection = ConfluenceConnection::new(config, Some(SubApp::new()));
  if let Err(e) = connection.connect() {
    eprintln!("{} {e}", colors.error("Error:"));
    process::exit(1);
  }

  let Some(addon) = connection.addon() else {
    eprintln!("{} add-on was not created", colors.error("Error:"));
    process::exit(1);
  };

  match serde_json::to_string_pretty(&addon.descriptor()) {
    Ok(json) => println!("{json}"),
    Err(e) => {
      eprintln!("{} failed to serialize descriptor: {e}", colors.error("Error:"));
      process::exit(1);
    }
  }
}
