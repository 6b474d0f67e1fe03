//! Persistence for the three document kinds: tables, rows and company
//! details. Handlers only see `Arc<dyn DocumentStore>`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::details::CompanyDetails;
use crate::listing::Listable;
use crate::schema::{Table, TableDraft};
use crate::value::{CellValue, RowValues};

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("store temporarily unavailable")]
    Temporary,

    #[error("store failure: {0}")]
    Fatal(String),
}

impl StoreError {
    pub const fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::Temporary => "temporary_error",
            StoreError::Fatal(_) => "fatal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Temporary => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored row. Column values sit flat beside the bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub table_id: Uuid,
    #[serde(flatten)]
    pub values: RowValues,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Row {
    pub fn new(table_id: Uuid, values: RowValues) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            table_id,
            values,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Listable for Row {
    fn values(&self) -> &RowValues {
        &self.values
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Tables in insertion order; callers apply display ordering.
    async fn list_tables(&self) -> StoreResult<Vec<Table>>;
    async fn get_table(&self, id: Uuid) -> StoreResult<Table>;
    /// Fails with `Conflict` when the name is taken.
    async fn insert_table(&self, table: Table) -> StoreResult<Table>;
    async fn update_table(&self, id: Uuid, draft: TableDraft) -> StoreResult<Table>;
    async fn delete_table(&self, id: Uuid) -> StoreResult<()>;
    /// Sets `order = index` for each listed id. Unknown ids are ignored.
    async fn set_table_order(&self, ids: &[Uuid]) -> StoreResult<()>;

    /// Rows of one table, or of all tables, in insertion order.
    async fn list_rows(&self, table_id: Option<Uuid>) -> StoreResult<Vec<Row>>;
    async fn get_row(&self, id: Uuid) -> StoreResult<Row>;
    async fn insert_row(&self, row: Row) -> StoreResult<Row>;
    async fn update_row(&self, row: Row) -> StoreResult<Row>;
    async fn delete_row(&self, id: Uuid) -> StoreResult<()>;

    async fn find_row_by_value(
        &self,
        table_id: Uuid,
        field: &str,
        value: &CellValue,
    ) -> StoreResult<Option<Row>> {
        let rows = self.list_rows(Some(table_id)).await?;
        Ok(rows.into_iter().find(|r| r.values.get(field) == Some(value)))
    }

    async fn list_details(&self) -> StoreResult<Vec<CompanyDetails>>;
    async fn get_details(&self, id: Uuid) -> StoreResult<CompanyDetails>;
    async fn find_details_by_company(&self, company_id: Uuid) -> StoreResult<Option<CompanyDetails>>;
    /// Assigns the id and timestamps. `Conflict` if the company already has one.
    async fn insert_details(&self, details: CompanyDetails) -> StoreResult<CompanyDetails>;
    /// Whole-document replace; keeps `createdAt`.
    async fn update_details(&self, id: Uuid, details: CompanyDetails) -> StoreResult<CompanyDetails>;
    async fn delete_details(&self, id: Uuid) -> StoreResult<()>;
}

/// Picks a backend from the database url: `memory://` or `postgres://…`.
pub async fn connect(url: &str) -> StoreResult<Arc<dyn DocumentStore>> {
    if url.starts_with("memory:") {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    #[cfg(feature = "postgres")]
    if url.starts_with("postgres:") || url.starts_with("postgresql:") {
        let store = PgStore::connect(url).await?;
        return Ok(Arc::new(store));
    }

    Err(StoreError::Fatal(format!("unsupported database url: {url}")))
}

/// First `unique` column whose value is already used by another row of the
/// table. Blank values never conflict.
pub async fn find_unique_conflict(
    store: &dyn DocumentStore,
    table: &Table,
    values: &RowValues,
    exclude: Option<Uuid>,
) -> StoreResult<Option<String>> {
    for column in table.columns().iter().filter(|c| c.is_unique()) {
        let Some(value) = values.get(&column.name).filter(|v| !v.is_blank()) else {
            continue;
        };
        if let Some(existing) = store.find_row_by_value(table.id, &column.name, value).await? {
            if Some(existing.id) != exclude {
                return Ok(Some(column.name.clone()));
            }
        }
    }
    Ok(None)
}

pub(crate) fn stamp_new_details(mut details: CompanyDetails) -> CompanyDetails {
    let now = Utc::now();
    details.id = Some(Uuid::now_v7());
    details.created_at = Some(now);
    details.updated_at = Some(now);
    details
}

pub(crate) fn stamp_replaced_details(
    id: Uuid,
    existing: &CompanyDetails,
    mut details: CompanyDetails,
) -> CompanyDetails {
    details.id = Some(id);
    details.created_at = existing.created_at;
    details.updated_at = Some(Utc::now());
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_serializes_flat() {
        let mut values = RowValues::new();
        values.insert("Company".into(), CellValue::text("Acme"));
        values.insert("Price".into(), CellValue::Number(12.5));
        let row = Row::new(Uuid::now_v7(), values);

        let json = serde_json::to_value(&row).expect("json");
        assert_eq!(json["Company"], "Acme");
        assert_eq!(json["Price"], 12.5);
        assert!(json.get("_id").is_some());
        assert!(json.get("tableId").is_some());

        let back: Row = serde_json::from_value(json).expect("row");
        assert_eq!(back, row);
    }

    #[test]
    fn status_codes() {
        assert_eq!(StoreError::NotFound("table").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(StoreError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(StoreError::Temporary.code(), "temporary_error");
    }

    #[tokio::test]
    async fn connect_rejects_unknown_scheme() {
        assert!(connect("mysql://localhost/db").await.is_err());
        assert!(connect("memory://").await.is_ok());
    }
}
