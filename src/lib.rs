//! Confluence connector library.
//!
//! [`ConfluenceConnection`] wraps a Confluence Cloud REST client and, when
//! the configuration carries an add-on block, an Atlassian Connect add-on
//! mounted on an injected host web app ([`SubApp`]).

pub mod addon;
pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod confluence;
pub mod connection;
pub mod credentials;
pub mod sub_app;

pub use addon::{AddonError, AtlassianAddon, WebhookEvent, WebhookHandler};
pub use config::{AddonInfo, ConfluenceConfig, ConnectionInfo, Vendor, WebhookSubscription};
pub use confluence::{ConfluenceApi, ConfluenceClient};
pub use connection::{ADDON_MOUNT_PATH, ConfluenceConnection, ConnectError};
pub use sub_app::SubApp;
