#![allow(dead_code)]

use axum_test::TestServer;
use ipodesk::Site;
use serde_json::{Value, json};

pub async fn server() -> TestServer {
    let site = Site::memory().await.expect("Failed to build site");
    TestServer::new(site.router()).unwrap()
}

pub fn ipo_table(name: &str) -> Value {
    json!({
        "tableName": name,
        "description": "Upcoming IPO listings",
        "columns": [
            {"name": "Company", "type": "text", "required": true, "unique": true},
            {"name": "Price", "type": "number", "required": true},
            {"name": "Sector", "type": "select", "required": false, "options": ["Tech", "Energy"]},
            {"name": "Website", "type": "url", "required": false}
        ],
        "settings": {
            "sortable": true,
            "filterable": true,
            "searchable": true,
            "pagination": true,
            "itemsPerPage": 2,
            "exportable": true
        }
    })
}

pub async fn create_table(server: &TestServer, body: Value) -> String {
    let response = server.post("/api/tables").json(&body).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json::<Value>()["data"]["_id"]
        .as_str()
        .expect("table id")
        .to_string()
}

pub async fn add_row(server: &TestServer, table_id: &str, data: Value) -> String {
    let response = server
        .post("/api/table-data")
        .json(&json!({"tableId": table_id, "data": data}))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json::<Value>()["data"]["_id"]
        .as_str()
        .expect("row id")
        .to_string()
}

/// Seeds the three-company `ipo_list` table and returns its id.
pub async fn seeded_ipo_list(server: &TestServer) -> String {
    let table_id = create_table(server, ipo_table("ipo_list")).await;
    add_row(server, &table_id, json!({"Company": "A", "Price": 10, "Sector": "Tech"})).await;
    add_row(server, &table_id, json!({"Company": "B", "Price": 5, "Sector": "Energy"})).await;
    add_row(server, &table_id, json!({"Company": "C", "Price": 20, "Sector": "Tech"})).await;
    table_id
}
