mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{add_row, create_table, ipo_table, seeded_ipo_list, server};

#[tokio::test]
async fn company_without_profile_is_basic() {
    let server = server().await;
    let table = create_table(&server, ipo_table("ipo_list")).await;
    let row = add_row(&server, &table, json!({"Company": "Acme", "Price": 12})).await;

    let body: Value = server.get(&format!("/api/public/company/{row}")).await.json();
    assert_eq!(body["data"]["hasDetailedProfile"], false);
    assert_eq!(body["data"]["name"], "Acme");
    assert_eq!(body["data"]["_id"], json!(row));
    assert_eq!(body["data"]["basicData"]["Price"], 12.0);
}

#[tokio::test]
async fn company_with_profile_returns_it() {
    let server = server().await;
    let table = create_table(&server, ipo_table("ipo_list")).await;
    let row = add_row(&server, &table, json!({"Company": "Acme", "Price": 12})).await;
    server
        .post("/api/company-details")
        .json(&json!({"companyId": row, "tableId": table, "companyName": "Acme Corp"}))
        .await;

    let body: Value = server.get(&format!("/api/public/company/{row}")).await.json();
    assert_eq!(body["data"]["hasDetailedProfile"], true);
    assert_eq!(body["data"]["companyName"], "Acme Corp");
    assert_eq!(body["data"]["companyId"], json!(row));
}

#[tokio::test]
async fn unknown_company() {
    let server = server().await;
    let response = server
        .get(&format!("/api/public/company/{}", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "Company not found");

    let response = server.get("/api/public/company/acme").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn name_survives_table_deletion() {
    let server = server().await;
    let table = create_table(&server, ipo_table("ipo_list")).await;
    let row = add_row(&server, &table, json!({"Company": "Acme", "Price": 12})).await;
    server.delete(&format!("/api/tables/{table}")).await;

    let body: Value = server.get(&format!("/api/public/company/{row}")).await.json();
    assert_eq!(body["data"]["name"], "Acme");
}

#[tokio::test]
async fn public_table_marks_profiles() {
    let server = server().await;
    let table = seeded_ipo_list(&server).await;
    let companies: Value = server
        .get("/api/companies")
        .add_query_param("tableId", &table)
        .await
        .json();
    let a = companies["data"][0]["_id"].as_str().expect("id").to_string();
    server
        .post("/api/company-details")
        .json(&json!({"companyId": a, "tableId": table}))
        .await;

    let body: Value = server
        .get(&format!("/api/public/tables/{table}"))
        .add_query_param("sort", "Company")
        .await
        .json();
    assert_eq!(body["table"]["tableName"], "ipo_list");
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["data"][0]["Company"], "A");
    assert_eq!(body["data"][0]["hasDetailedProfile"], true);
    assert_eq!(body["data"][1]["hasDetailedProfile"], false);
}

#[tokio::test]
async fn companies_are_named_by_first_column() {
    let server = server().await;
    let table = seeded_ipo_list(&server).await;

    let body: Value = server
        .get("/api/companies")
        .add_query_param("tableId", &table)
        .await
        .json();
    assert_eq!(body["count"], 3);
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("companies")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(body["data"][0]["tableId"], json!(table));

    let response = server.get("/api/companies").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
