// Integration tests for Site construction and the router-wide layers.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use ipodesk::store::{DocumentStore, MemoryStore};
use ipodesk::testing::TestClient;
use ipodesk::{Site, SiteConf};
use serde_json::{Value, json};

#[tokio::test]
async fn test_unknown_routes_are_json_404() {
    let site = Site::memory().await.expect("Failed to build site");
    let server = TestServer::new(site.router()).unwrap();

    let response = server.get("/api/unknown").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let site = Site::memory().await.expect("Failed to build site");
    let server = TestServer::new(site.router()).unwrap();
    let response = server.patch("/api/tables").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let site = Site::memory().await.expect("Failed to build site");
    let server = TestServer::new(site.router()).unwrap();
    let response = server
        .post("/api/tables")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_builder_uses_given_store() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let mut conf = SiteConf::memory();
    conf.database = "postgres://unused".into();
    let site = Site::builder(conf)
        .with_store(store.clone())
        .build()
        .await
        .expect("Failed to build site");

    let server = TestServer::new(site.router()).unwrap();
    let response = server
        .post("/api/tables")
        .json(&json!({
            "tableName": "ipo_list",
            "description": "Upcoming IPO listings",
            "columns": [{"name": "Company", "type": "text", "required": true}],
            "settings": {
                "sortable": true, "filterable": true, "searchable": true,
                "pagination": true, "itemsPerPage": 10, "exportable": true
            }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(store.list_tables().await.expect("tables").len(), 1);
}

#[tokio::test]
async fn test_unsupported_database_url() {
    let mut conf = SiteConf::memory();
    conf.database = "mongodb://localhost".into();
    assert!(Site::builder(conf).build().await.is_err());
}

#[tokio::test]
async fn test_client_round_trip() {
    let client = TestClient::memory().await;
    let tables = client.get("/api/tables").send().await.data(StatusCode::OK).await;
    assert_eq!(tables, json!([]));

    let msg = client
        .get("/api/tables/123")
        .send()
        .await
        .error(StatusCode::BAD_REQUEST)
        .await;
    assert_eq!(msg, "Invalid table ID format");
    assert!(client.site().uptime().as_secs() < 60);
}
