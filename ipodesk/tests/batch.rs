mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{add_row, create_table, ipo_table, server};

#[tokio::test]
async fn skips_existing_rows_by_key() {
    let server = server().await;
    let table = create_table(&server, ipo_table("ipo_list")).await;
    add_row(&server, &table, json!({"Company": "Acme", "Price": 1})).await;

    let response = server
        .post("/api/table-data/batch")
        .json(&json!({
            "tableId": table,
            "data": [
                {"Company": "Acme", "Price": 1},
                {"Company": "Beta", "Price": 2},
                {"Company": "Gamma", "Price": 3}
            ],
            "uniqueKeyField": "Company",
            "skipDuplicates": true
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["success"], 2);
    assert_eq!(body["data"]["skipped"], 1);
    assert_eq!(body["data"]["failed"], 0);
    assert_eq!(body["message"], "Imported 2 rows (1 skipped, 0 failed)");

    let rows: Value = server
        .get("/api/table-data")
        .add_query_param("tableId", &table)
        .await
        .json();
    assert_eq!(rows["count"], 3);
}

#[tokio::test]
async fn bad_rows_fail_without_stopping_the_batch() {
    let server = server().await;
    let table = create_table(&server, ipo_table("ipo_list")).await;

    let response = server
        .post("/api/table-data/batch")
        .json(&json!({
            "tableId": table,
            "data": [
                {"Company": "Acme", "Price": 1},
                {"Company": "", "Price": 2},
                {"Company": "Acme", "Price": 3},
                {"Company": "Delta", "Price": 4}
            ]
        }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["data"]["success"], 2);
    assert_eq!(body["data"]["failed"], 2);
    let indexes: Vec<u64> = body["data"]["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|e| e["index"].as_u64())
        .collect();
    assert_eq!(indexes, vec![1, 2]);
    assert_eq!(body["data"]["errors"][1]["error"], "Value for Company must be unique");
}

#[tokio::test]
async fn unknown_table_fails_the_request() {
    let server = server().await;
    let response = server
        .post("/api/table-data/batch")
        .json(&json!({"tableId": uuid::Uuid::now_v7(), "data": []}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
