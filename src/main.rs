//! confluence-connect - Confluence connector and Connect add-on host

#[tokio::main]
async fn main() {
  confluence_connect::cli::run().await;
}
