use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use super::{DocumentStore, Row, StoreError, StoreResult, stamp_new_details, stamp_replaced_details};
use crate::details::CompanyDetails;
use crate::schema::{Table, TableDraft};
use crate::value::CellValue;

const BOOTSTRAP: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS ipodesk_tables (
        id UUID PRIMARY KEY,
        doc JSONB NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS ipodesk_tables_name_key
        ON ipodesk_tables ((doc->>'tableName'))",
    "CREATE TABLE IF NOT EXISTS ipodesk_rows (
        id UUID PRIMARY KEY,
        table_id UUID NOT NULL,
        doc JSONB NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS ipodesk_rows_table_idx ON ipodesk_rows (table_id)",
    "CREATE TABLE IF NOT EXISTS ipodesk_details (
        id UUID PRIMARY KEY,
        company_id UUID NOT NULL UNIQUE,
        doc JSONB NOT NULL
    )",
];

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound("document"),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                let what = match db.constraint() {
                    Some("ipodesk_tables_name_key") => "A table with this name already exists",
                    Some("ipodesk_details_company_id_key") => {
                        "Company details already exist for this company"
                    }
                    _ => "Duplicate document",
                };
                StoreError::Conflict(what.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => StoreError::Temporary,
            _ => StoreError::Fatal(e.to_string()),
        }
    }
}

/// JSONB-document store. Each entity is kept whole in a `doc` column; ids
/// and unique keys are mirrored into real columns for indexing.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and runs the bootstrap DDL. `?max=` and `?min=` on the url
    /// size the pool.
    pub async fn connect(db_url: &str) -> StoreResult<Self> {
        let parts = db_url
            .parse::<url::Url>()
            .map_err(|e| StoreError::Fatal(format!("Invalid database URL: {e}")))?;

        let query: HashMap<String, String> = parts
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let max_connections = query.get("max").and_then(|s| s.parse().ok()).unwrap_or(10);
        let min_connections = query.get("min").and_then(|s| s.parse().ok()).unwrap_or(1);

        let mut clean = parts.clone();
        let rest: Vec<(String, String)> = parts
            .query_pairs()
            .filter(|(k, _)| k != "max" && k != "min")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if rest.is_empty() {
            clean.set_query(None);
        } else {
            clean.query_pairs_mut().clear().extend_pairs(rest);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(clean.as_str())
            .await?;

        let store = Self { pool };
        store.bootstrap().await?;
        tracing::info!(max_connections, min_connections, "Connected to Postgres store");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn bootstrap(&self) -> StoreResult<()> {
        for ddl in BOOTSTRAP {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn missing(what: &'static str) -> impl FnOnce(StoreError) -> StoreError {
    move |e| match e {
        StoreError::NotFound(_) => StoreError::NotFound(what),
        other => other,
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        let docs: Vec<Json<Table>> = sqlx::query_scalar("SELECT doc FROM ipodesk_tables ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(docs.into_iter().map(|d| d.0).collect())
    }

    async fn get_table(&self, id: Uuid) -> StoreResult<Table> {
        let doc: Json<Table> = sqlx::query_scalar("SELECT doc FROM ipodesk_tables WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)
            .map_err(missing("table"))?;
        Ok(doc.0)
    }

    async fn insert_table(&self, table: Table) -> StoreResult<Table> {
        sqlx::query("INSERT INTO ipodesk_tables (id, doc) VALUES ($1, $2)")
            .bind(table.id)
            .bind(Json(&table))
            .execute(&self.pool)
            .await?;
        Ok(table)
    }

    async fn update_table(&self, id: Uuid, draft: TableDraft) -> StoreResult<Table> {
        let mut table = self.get_table(id).await?;
        table.replace(draft);
        sqlx::query("UPDATE ipodesk_tables SET doc = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&table))
            .execute(&self.pool)
            .await?;
        Ok(table)
    }

    async fn delete_table(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM ipodesk_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("table"));
        }
        Ok(())
    }

    async fn set_table_order(&self, ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE ipodesk_tables SET doc = jsonb_set(doc, '{order}', to_jsonb($2::int)) WHERE id = $1")
                .bind(id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_rows(&self, table_id: Option<Uuid>) -> StoreResult<Vec<Row>> {
        let docs: Vec<Json<Row>> = sqlx::query_scalar(
            "SELECT doc FROM ipodesk_rows WHERE $1::uuid IS NULL OR table_id = $1 ORDER BY id",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|d| d.0).collect())
    }

    async fn get_row(&self, id: Uuid) -> StoreResult<Row> {
        let doc: Json<Row> = sqlx::query_scalar("SELECT doc FROM ipodesk_rows WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)
            .map_err(missing("row"))?;
        Ok(doc.0)
    }

    async fn insert_row(&self, row: Row) -> StoreResult<Row> {
        sqlx::query("INSERT INTO ipodesk_rows (id, table_id, doc) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(row.table_id)
            .bind(Json(&row))
            .execute(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_row(&self, mut row: Row) -> StoreResult<Row> {
        let existing = self.get_row(row.id).await?;
        row.created_at = existing.created_at;
        row.updated_at = Utc::now();
        sqlx::query("UPDATE ipodesk_rows SET table_id = $2, doc = $3 WHERE id = $1")
            .bind(row.id)
            .bind(row.table_id)
            .bind(Json(&row))
            .execute(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_row(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM ipodesk_rows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("row"));
        }
        Ok(())
    }

    async fn find_row_by_value(
        &self,
        table_id: Uuid,
        field: &str,
        value: &CellValue,
    ) -> StoreResult<Option<Row>> {
        let doc: Option<Json<Row>> = sqlx::query_scalar(
            "SELECT doc FROM ipodesk_rows WHERE table_id = $1 AND doc -> $2 = $3 ORDER BY id LIMIT 1",
        )
        .bind(table_id)
        .bind(field)
        .bind(Json(value))
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|d| d.0))
    }

    async fn list_details(&self) -> StoreResult<Vec<CompanyDetails>> {
        let docs: Vec<Json<CompanyDetails>> =
            sqlx::query_scalar("SELECT doc FROM ipodesk_details ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(docs.into_iter().map(|d| d.0).collect())
    }

    async fn get_details(&self, id: Uuid) -> StoreResult<CompanyDetails> {
        let doc: Json<CompanyDetails> = sqlx::query_scalar("SELECT doc FROM ipodesk_details WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)
            .map_err(missing("company details"))?;
        Ok(doc.0)
    }

    async fn find_details_by_company(&self, company_id: Uuid) -> StoreResult<Option<CompanyDetails>> {
        let doc: Option<Json<CompanyDetails>> =
            sqlx::query_scalar("SELECT doc FROM ipodesk_details WHERE company_id = $1")
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(doc.map(|d| d.0))
    }

    async fn insert_details(&self, details: CompanyDetails) -> StoreResult<CompanyDetails> {
        let details = stamp_new_details(details);
        sqlx::query("INSERT INTO ipodesk_details (id, company_id, doc) VALUES ($1, $2, $3)")
            .bind(details.id)
            .bind(details.company_id)
            .bind(Json(&details))
            .execute(&self.pool)
            .await?;
        Ok(details)
    }

    async fn update_details(&self, id: Uuid, details: CompanyDetails) -> StoreResult<CompanyDetails> {
        let existing = self.get_details(id).await?;
        let details = stamp_replaced_details(id, &existing, details);
        sqlx::query("UPDATE ipodesk_details SET company_id = $2, doc = $3 WHERE id = $1")
            .bind(id)
            .bind(details.company_id)
            .bind(Json(&details))
            .execute(&self.pool)
            .await?;
        Ok(details)
    }

    async fn delete_details(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM ipodesk_details WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("company details"));
        }
        Ok(())
    }
}
