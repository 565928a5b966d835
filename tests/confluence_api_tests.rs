//! Page workflows against the fake Confluence client, driven through the
//! `ConfluenceApi` trait object the same way host code would.

mod common;

use common::fake_confluence::FakeConfluenceClient;
use confluence_connect::confluence::ConfluenceApi;

fn api(client: FakeConfluenceClient) -> Box<dyn ConfluenceApi> {
  Box::new(client)
}

#[tokio::test]
async fn test_fetch_page_with_expanded_fields() {
  let api = api(FakeConfluenceClient::with_sample_pages());

  let page = api.get_page("123456").await.unwrap();
  assert_eq!(page.title, "Getting Started Guide");
  assert_eq!(page.version.unwrap().number, 3);
  assert_eq!(page.space.unwrap().key, "DOCS");
  assert!(
    page
      .body
      .and_then(|b| b.storage)
      .unwrap()
      .value
      .contains("Welcome to our documentation")
  );
}

#[tokio::test]
async fn test_missing_page_is_an_error() {
  let api = api(FakeConfluenceClient::with_sample_pages());
  let err = api.get_page("999999").await.unwrap_err();
  assert!(err.to_string().contains("999999"));
}

#[tokio::test]
async fn test_children_and_space() {
  let api = api(FakeConfluenceClient::with_sample_pages());

  let children = api.get_child_pages("123456").await.unwrap();
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].title, "Installation");
  assert!(api.get_child_pages("123457").await.unwrap().is_empty());

  assert_eq!(api.get_space("DOCS").await.unwrap().name, "Documentation");
  assert!(api.get_space("NOPE").await.is_err());
}

#[tokio::test]
async fn test_create_then_update_page() {
  let api = api(FakeConfluenceClient::with_sample_pages());

  let created = api
    .create_page("DOCS", "Release Notes", "<p>v1</p>", Some("123456"))
    .await
    .unwrap();
  assert_eq!(created.version.as_ref().unwrap().number, 1);
  assert_eq!(api.get_child_pages("123456").await.unwrap().len(), 2);

  let updated = api
    .update_page(&created.id, "Release Notes", "<p>v2</p>", 2)
    .await
    .unwrap();
  assert_eq!(updated.version.unwrap().number, 2);

  let stale = api.update_page(&created.id, "Release Notes", "<p>v2 again</p>", 2).await;
  assert!(stale.unwrap_err().to_string().contains("409"));
}

#[tokio::test]
async fn test_create_rejects_duplicate_title() {
  let api = api(FakeConfluenceClient::with_sample_pages());
  let result = api.create_page("DOCS", "Getting Started Guide", "<p/>", None).await;
  assert!(result.is_err());
}

#[tokio::test]
async fn test_search_by_text_respects_limit() {
  let api = api(FakeConfluenceClient::with_sample_pages());

  let found = api.search(r#"text ~ "installation""#, 10).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].id, "123457");

  assert_eq!(api.search("space = DOCS", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_current_user() {
  let api_ok = api(FakeConfluenceClient::new());
  assert_eq!(api_ok.current_user().await.unwrap().display_name, "Test User");

  let mut failing = FakeConfluenceClient::new();
  failing.set_auth_success(false);
  assert!(api(failing).current_user().await.is_err());
}
