//! Bulk row import. Rows are handled one at a time; a failure is recorded
//! and the loop moves on. Nothing is rolled back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::RowContract;
use crate::errors::{ApiError, ApiResult};
use crate::store::{DocumentStore, Row, StoreError, find_unique_conflict};
use crate::value::RowValues;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub table_id: Uuid,
    pub data: Vec<RowValues>,
    #[serde(default)]
    pub unique_key_field: Option<String>,
    #[serde(default)]
    pub skip_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<RowFailure>,
}

impl BatchSummary {
    fn fail(&mut self, index: usize, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowFailure {
            index,
            error: error.into(),
        });
    }

    pub fn message(&self) -> String {
        format!(
            "Imported {} rows ({} skipped, {} failed)",
            self.success, self.skipped, self.failed
        )
    }
}

enum Outcome {
    Inserted,
    Skipped,
    Failed(String),
}

pub async fn import(store: &dyn DocumentStore, request: BatchRequest) -> ApiResult<BatchSummary> {
    let BatchRequest {
        table_id,
        data,
        unique_key_field,
        skip_duplicates,
    } = request;
    let table = store
        .get_table(table_id)
        .await
        .map_err(ApiError::store("fetch table"))?;
    let contract = RowContract::build(&table)?;
    let unique_key = unique_key_field.as_deref().filter(|k| !k.is_empty());

    let mut summary = BatchSummary::default();
    for (index, values) in data.into_iter().enumerate() {
        let outcome = async {
            let normalized = match contract.validate(&values) {
                Ok(row) => row,
                Err(report) => return Ok(Outcome::Failed(report.to_string())),
            };

            // looked up on the normalized value so "10" finds a stored 10
            if let Some(key) = unique_key {
                if let Some(value) = normalized.get(key).filter(|v| !v.is_blank()) {
                    if store.find_row_by_value(table.id, key, value).await?.is_some() {
                        if skip_duplicates {
                            return Ok(Outcome::Skipped);
                        }
                        return Ok(Outcome::Failed(format!("Duplicate value for {key}: {value}")));
                    }
                }
            }

            if let Some(column) = find_unique_conflict(store, &table, &normalized, None).await? {
                return Ok(Outcome::Failed(format!("Value for {column} must be unique")));
            }
            store.insert_row(Row::new(table.id, normalized)).await?;
            Ok::<_, StoreError>(Outcome::Inserted)
        }
        .await;

        match outcome {
            Ok(Outcome::Inserted) => summary.success += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Ok(Outcome::Failed(reason)) => summary.fail(index, reason),
            Err(e @ StoreError::Conflict(_)) => summary.fail(index, e.to_string()),
            Err(e) => {
                tracing::error!(index, error = %e, "Batch row failed");
                summary.fail(index, "Failed to save row");
            }
        }
    }

    tracing::info!(
        table = %table.id,
        success = summary.success,
        skipped = summary.skipped,
        failed = summary.failed,
        "Batch import finished"
    );
    Ok(summary)
}
