use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiQuery, ApiResponse, company_name, parse_id, required_param};
use crate::Site;
use crate::errors::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompaniesQuery {
    table_id: Option<String>,
}

/// Picker entry for the detail editor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    table_id: Uuid,
}

pub async fn list(
    State(site): State<Site>,
    ApiQuery(query): ApiQuery<CompaniesQuery>,
) -> ApiResult<ApiResponse<Vec<CompanySummary>>> {
    let table_id = parse_id(required_param(query.table_id.as_deref(), "Table")?, "table")?;
    let store = site.store();
    let table = store
        .get_table(table_id)
        .await
        .map_err(ApiError::store("fetch companies"))?;
    if table.name_column().is_none() {
        return Err(ApiError::BadRequest("Table has no columns".into()));
    }

    let companies: Vec<CompanySummary> = store
        .list_rows(Some(table_id))
        .await
        .map_err(ApiError::store("fetch companies"))?
        .into_iter()
        .map(|row| CompanySummary {
            id: row.id,
            name: company_name(Some(&table), &row.values),
            table_id,
        })
        .collect();
    let count = companies.len();
    Ok(ApiResponse::ok(companies).with_count(count))
}
