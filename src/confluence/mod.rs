//! Confluence REST API access: the [`ConfluenceApi`] trait, its HTTP
//! implementation, and the data models it exchanges.

pub mod api;
pub mod client;
pub mod models;

pub use api::ConfluenceApi;
pub use client::ConfluenceClient;
pub use models::{Page, PageBody, PageLinks, PageVersion, Space, StorageFormat, UserInfo};
