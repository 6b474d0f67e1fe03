use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiJson, ApiQuery, ApiResponse, parse_id, required_param};
use crate::Site;
use crate::batch::{self, BatchRequest, BatchSummary};
use crate::contract::RowContract;
use crate::errors::{ApiError, ApiResult};
use crate::schema::Table;
use crate::store::{Row, find_unique_conflict};
use crate::value::RowValues;

/// Keys the store owns; ignored when they appear in submitted values.
const RESERVED: [&str; 4] = ["_id", "tableId", "createdAt", "updatedAt"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsQuery {
    table_id: Option<String>,
}

pub async fn list(
    State(site): State<Site>,
    ApiQuery(query): ApiQuery<RowsQuery>,
) -> ApiResult<ApiResponse<Vec<Row>>> {
    let table_id = parse_id(required_param(query.table_id.as_deref(), "Table")?, "table")?;
    let store = site.store();
    store
        .get_table(table_id)
        .await
        .map_err(ApiError::store("fetch table"))?;
    let mut rows = store
        .list_rows(Some(table_id))
        .await
        .map_err(ApiError::store("fetch table data"))?;
    rows.reverse();
    let count = rows.len();
    Ok(ApiResponse::ok(rows).with_count(count))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRow {
    table_id: String,
    data: RowValues,
}

async fn validated(
    site: &Site,
    table: &Table,
    values: &RowValues,
    exclude: Option<Uuid>,
) -> ApiResult<RowValues> {
    let contract = RowContract::build(table)?;
    let normalized = contract.validate(values)?;
    let conflict = find_unique_conflict(site.store().as_ref(), table, &normalized, exclude)
        .await
        .map_err(ApiError::store("check unique values"))?;
    if let Some(column) = conflict {
        return Err(ApiError::Conflict(format!("Value for {column} must be unique")));
    }
    Ok(normalized)
}

fn strip_reserved(mut values: RowValues) -> RowValues {
    for key in RESERVED {
        values.shift_remove(key);
    }
    values
}

pub async fn create(
    State(site): State<Site>,
    ApiJson(body): ApiJson<CreateRow>,
) -> ApiResult<ApiResponse<Row>> {
    let table_id = parse_id(&body.table_id, "table")?;
    let table = site
        .store()
        .get_table(table_id)
        .await
        .map_err(ApiError::store("fetch table"))?;
    let values = validated(&site, &table, &strip_reserved(body.data), None).await?;
    let row = site
        .store()
        .insert_row(Row::new(table.id, values))
        .await
        .map_err(ApiError::store("add table data"))?;
    Ok(ApiResponse::created(row))
}

pub async fn fetch(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<Row>> {
    let id = parse_id(&id, "row")?;
    let row = site
        .store()
        .get_row(id)
        .await
        .map_err(ApiError::store("fetch table data"))?;
    Ok(ApiResponse::ok(row))
}

/// Submitted values are merged over the stored row, then the whole row is
/// validated against the current table definition.
pub async fn update(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiJson(values): ApiJson<RowValues>,
) -> ApiResult<ApiResponse<Row>> {
    let id = parse_id(&id, "row")?;
    let store = site.store();
    let mut row = store.get_row(id).await.map_err(ApiError::store("fetch table data"))?;
    let table = store
        .get_table(row.table_id)
        .await
        .map_err(ApiError::store("fetch table"))?;

    let mut merged = row.values.clone();
    merged.extend(strip_reserved(values));
    row.values = validated(&site, &table, &merged, Some(id)).await?;

    let row = store
        .update_row(row)
        .await
        .map_err(ApiError::store("update table data"))?;
    Ok(ApiResponse::ok(row).with_message("Data updated successfully"))
}

pub async fn remove(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<()>> {
    let id = parse_id(&id, "row")?;
    site.store()
        .delete_row(id)
        .await
        .map_err(ApiError::store("delete table data"))?;
    Ok(ApiResponse::message("Data deleted successfully"))
}

pub async fn batch(
    State(site): State<Site>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> ApiResult<ApiResponse<BatchSummary>> {
    let summary = batch::import(site.store().as_ref(), request).await?;
    let message = summary.message();
    Ok(ApiResponse::ok(summary).with_message(message))
}
