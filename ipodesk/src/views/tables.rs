use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::Deserialize;

use super::{ApiJson, ApiQuery, ApiResponse, PageResponse, listing_query, parse_id};
use crate::Site;
use crate::errors::{ApiError, ApiResult};
use crate::forms::{FormSpec, RowForm};
use crate::listing;
use crate::schema::{self, Table, TableDraft};
use crate::store::Row;
use crate::validation::Validate;

pub async fn list(State(site): State<Site>) -> ApiResult<ApiResponse<Vec<Table>>> {
    let mut tables = site
        .store()
        .list_tables()
        .await
        .map_err(ApiError::store("fetch tables"))?;
    schema::sort_for_display(&mut tables);
    let count = tables.len();
    Ok(ApiResponse::ok(tables).with_count(count))
}

pub async fn create(
    State(site): State<Site>,
    ApiJson(draft): ApiJson<TableDraft>,
) -> ApiResult<ApiResponse<Table>> {
    draft.validate()?;
    let table = site
        .store()
        .insert_table(Table::new(draft))
        .await
        .map_err(ApiError::store("create table"))?;
    tracing::info!(table = %table.id, name = table.name(), "Table created");
    Ok(ApiResponse::created(table).with_message("Table created successfully"))
}

pub async fn fetch(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<Table>> {
    let id = parse_id(&id, "table")?;
    let table = site
        .store()
        .get_table(id)
        .await
        .map_err(ApiError::store("fetch table"))?;
    Ok(ApiResponse::ok(table))
}

pub async fn update(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<TableDraft>,
) -> ApiResult<ApiResponse<Table>> {
    let id = parse_id(&id, "table")?;
    draft.validate()?;
    let table = site
        .store()
        .update_table(id, draft)
        .await
        .map_err(ApiError::store("update table"))?;
    Ok(ApiResponse::ok(table).with_message("Table updated successfully"))
}

/// Removes the definition only; rows stay in the store.
pub async fn remove(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<()>> {
    let id = parse_id(&id, "table")?;
    site.store()
        .delete_table(id)
        .await
        .map_err(ApiError::store("delete table"))?;
    tracing::info!(table = %id, "Table deleted");
    Ok(ApiResponse::message("Table deleted successfully"))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    order: Vec<String>,
}

pub async fn reorder(
    State(site): State<Site>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> ApiResult<ApiResponse<()>> {
    let ids = body
        .order
        .iter()
        .map(|raw| parse_id(raw, "table"))
        .collect::<ApiResult<Vec<_>>>()?;
    site.store()
        .set_table_order(&ids)
        .await
        .map_err(ApiError::store("update table order"))?;
    Ok(ApiResponse::message("Table order updated successfully"))
}

async fn table_and_rows(site: &Site, raw_id: &str) -> ApiResult<(Table, Vec<Row>)> {
    let id = parse_id(raw_id, "table")?;
    let store = site.store();
    let table = store.get_table(id).await.map_err(ApiError::store("fetch table"))?;
    let rows = store
        .list_rows(Some(id))
        .await
        .map_err(ApiError::store("fetch table data"))?;
    Ok((table, rows))
}

pub async fn rows(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<IndexMap<String, String>>,
) -> ApiResult<PageResponse<Row>> {
    let query = listing_query(&params)?;
    let (table, rows) = table_and_rows(&site, &id).await?;
    let page = listing::apply(table.settings(), rows, &query);
    Ok(PageResponse::new(page, None))
}

/// CSV of every row that survives search, filters and sort.
pub async fn export(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<IndexMap<String, String>>,
) -> ApiResult<Response> {
    let query = listing_query(&params)?;
    let (table, rows) = table_and_rows(&site, &id).await?;
    if !table.settings().exportable {
        return Err(ApiError::BadRequest("Export is disabled for this table".into()));
    }
    let rows = listing::process(table.settings(), rows, &query);
    let csv = listing::export_csv(table.columns(), &rows);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        listing::export_filename(table.name())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

pub async fn form(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<FormSpec>> {
    let id = parse_id(&id, "table")?;
    let table = site
        .store()
        .get_table(id)
        .await
        .map_err(ApiError::store("fetch table"))?;
    Ok(ApiResponse::ok(RowForm::new(&table).spec()))
}
