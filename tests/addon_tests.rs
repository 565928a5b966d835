//! Add-on mode end to end: connect, install a tenant, deliver signed
//! webhooks through the host web app, uninstall.

mod common;

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::fixtures;
use confluence_connect::addon::jwt::{self, ConnectClaims};
use confluence_connect::{ADDON_MOUNT_PATH, ConfluenceConnection, SubApp, WebhookEvent};
use serde_json::{Value, json};
use tower::ServiceExt;

const CLIENT_KEY: &str = "tenant-1";
const SECRET: &str = "s3cr3t";

fn signed(method: &str, path: &str, query: Option<&str>) -> String {
  let now = Utc::now().timestamp();
  jwt::sign(
    &ConnectClaims {
      iss: CLIENT_KEY.to_string(),
      iat: now,
      exp: now + 180,
      qsh: Some(jwt::query_string_hash(method, path, query)),
      sub: None,
    },
    SECRET,
  )
  .unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
  let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
  if let Some(token) = token {
    builder = builder.header(AUTHORIZATION, format!("JWT {token}"));
  }
  builder.body(Body::from(body.to_string())).unwrap()
}

async fn install(router: &Router) {
  let response = router
    .clone()
    .oneshot(post_json(
      &format!("{ADDON_MOUNT_PATH}/installed"),
      None,
      &fixtures::install_payload(CLIENT_KEY, SECRET),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_plain_connection_has_no_addon_routes() {
  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(fixtures::plain_config(), Some(app.clone()));
  connection.connect().unwrap();

  assert!(connection.api().is_some());
  assert!(connection.addon().is_none());

  let response = app
    .router()
    .oneshot(Request::get("/jira/addon/addon").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_descriptor_served_from_host_app() {
  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(fixtures::addon_config(), Some(app.clone()));
  connection.connect().unwrap();

  let response = app
    .router()
    .oneshot(Request::get("/jira/addon/addon").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);

  let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let descriptor: Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(descriptor["key"], "com.example.bot");
  assert_eq!(descriptor["baseUrl"], "https://bots.example.com");
  assert_eq!(descriptor["authentication"]["type"], "jwt");
  assert_eq!(descriptor["lifecycle"]["installed"], "/jira/addon/installed");
  assert_eq!(
    descriptor["modules"]["webhooks"],
    json!([
      { "event": "page_created", "url": "/jira/addon/webhooks/page_created" },
      { "event": "page_removed", "url": "/jira/addon/webhooks/page_removed" }
    ])
  );
}

#[tokio::test]
async fn test_install_webhook_uninstall_lifecycle() {
  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(fixtures::addon_config(), Some(app.clone()));
  connection.connect().unwrap();
  let addon = connection.addon().unwrap().clone();

  let created = Arc::new(Mutex::new(Vec::<WebhookEvent>::new()));
  let sink = Arc::clone(&created);
  addon.on_webhook("/a", move |event: WebhookEvent| {
    let sink = Arc::clone(&sink);
    async move {
      sink.lock().unwrap().push(event);
      Ok::<(), anyhow::Error>(())
    }
  });

  let router = app.router();
  install(&router).await;
  let tenant = addon.tenants().get(CLIENT_KEY).await.unwrap().unwrap();
  assert_eq!(tenant.shared_secret, SECRET);

  let path = "/jira/addon/webhooks/page_created";
  let query = "user_id=abc";
  let uri = format!("{path}?{query}");
  let response = router
    .clone()
    .oneshot(post_json(
      &uri,
      Some(&signed("POST", path, Some(query))),
      &json!({ "page": { "id": 42, "title": "New page" } }),
    ))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);

  // No handler for "/b": the delivery is accepted and dropped.
  let removed = "/jira/addon/webhooks/page_removed";
  let response = router
    .clone()
    .oneshot(post_json(removed, Some(&signed("POST", removed, None)), &json!({})))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);

  {
    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].event, "page_created");
    assert_eq!(created[0].path, "/a");
    assert_eq!(created[0].client_key, CLIENT_KEY);
    assert_eq!(created[0].payload["page"]["id"], 42);
  }

  let uninstall = "/jira/addon/uninstalled";
  let response = router
    .clone()
    .oneshot(post_json(uninstall, Some(&signed("POST", uninstall, None)), &json!({})))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
  assert!(addon.tenants().get(CLIENT_KEY).await.unwrap().is_none());

  // The tenant is gone, so its tokens no longer authenticate.
  let response = router
    .oneshot(post_json(path, Some(&signed("POST", path, None)), &json!({})))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_in_query_parameter() {
  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(fixtures::addon_config(), Some(app.clone()));
  connection.connect().unwrap();

  let router = app.router();
  install(&router).await;

  let path = "/jira/addon/webhooks/page_created";
  let token = signed("POST", path, None);
  let response = router
    .oneshot(post_json(&format!("{path}?jwt={token}"), None, &json!({})))
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_tenants_persist_in_sqlite_file_across_reconnect() {
  let dir = tempfile::tempdir().unwrap();
  let db = dir.path().join("tenants.db");

  let mut config = fixtures::addon_config();
  config.connection_string = Some(format!("sqlite://{}", db.display()));

  let app = SubApp::new();
  let mut connection = ConfluenceConnection::new(config, Some(app.clone()));
  connection.connect().unwrap();
  install(&app.router()).await;

  connection.disconnect();
  connection.connect().unwrap();

  assert_eq!(app.mounted_paths(), vec![ADDON_MOUNT_PATH.to_string()]);
  let tenants = connection.addon().unwrap().tenants().list().await.unwrap();
  assert_eq!(tenants.len(), 1);
  assert_eq!(tenants[0].client_key, CLIENT_KEY);
}
