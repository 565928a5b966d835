//! `confluence-connect serve`: connect and expose the host web app.

use std::future::Future;
use std::net::SocketAddr;
use std::process;

use tokio::net::TcpListener;
use tracing::{info, warn};

use super::load_config;
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::connection::ConfluenceConnection;
use crate::sub_app::SubApp;

pub(crate) async fn handle_serve_command(listen: SocketAddr, cli: &Cli, colors: &ColorScheme) {
  let config = match load_config(cli) {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{} {e:#}", colors.error("Error:"));
      process::exit(1);
    }
  };

  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(config, Some(app.clone()));
  if let Err(e) = connection.connect() {
    eprintln!("{} {e}", colors.error("Error:"));
    process::exit(1);
  }

  match connection.addon() {
    Some(addon) => {
      let base_url = connection.config().base_url.as_deref().unwrap_or_default();
      println!(
        "{} Add-on {} descriptor at {}",
        colors.info("→"),
        colors.emphasis(addon.key()),
        colors.link(format!("{base_url}{}/addon", addon.mount_path()))
      );
    }
    None => warn!("No add-on configured; the server has no routes"),
  }

  let listener = match TcpListener::bind(listen).await {
    Ok(listener) => listener,
    Err(e) => {
      eprintln!("{} failed to bind {listen}: {e}", colors.error("Error:"));
      process::exit(1);
    }
  };

  println!("{} Listening on {}", colors.success("✓"), colors.link(format!("http://{listen}")));

  if let Err(e) = serve(listener, &app, shutdown_signal()).await {
    eprintln!("{} server error: {e:#}", colors.error("Error:"));
    process::exit(1);
  }

  connection.disconnect();
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub(crate) async fn serve(
  listener: TcpListener,
  app: &SubApp,
  shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
  let addr = listener.local_addr()?;
  info!(%addr, mounts = ?app.mounted_paths(), "Serving host web app");

  axum::serve(listener, app.router())
    .with_graceful_shutdown(shutdown)
    .await?;

  info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
  }
}
