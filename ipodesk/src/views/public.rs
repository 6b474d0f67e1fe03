//! Read-only surface for the public site.

use axum::extract::{Path, State};
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use super::{ApiQuery, ApiResponse, PageResponse, company_name, listing_query, parse_id};
use crate::Site;
use crate::cache::DetailsCache;
use crate::details::CompanyDetails;
use crate::errors::{ApiError, ApiResult};
use crate::listing::{self, ListingPage};
use crate::schema::{Column, Table, TableSettings};
use crate::store::{Row, StoreError};
use crate::value::RowValues;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PublicCompany {
    Profile {
        #[serde(flatten)]
        details: Box<CompanyDetails>,
        #[serde(rename = "hasDetailedProfile")]
        has_detailed_profile: bool,
    },
    Basic {
        #[serde(rename = "_id")]
        id: Uuid,
        name: String,
        #[serde(rename = "basicData")]
        basic_data: RowValues,
        #[serde(rename = "hasDetailedProfile")]
        has_detailed_profile: bool,
    },
}

pub async fn company(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<PublicCompany>> {
    let id = parse_id(&id, "company")?;
    let store = site.store();
    let row = store.get_row(id).await.map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::NotFound("company"),
        other => ApiError::store("fetch company details")(other),
    })?;

    if let Some(details) = store
        .find_details_by_company(id)
        .await
        .map_err(ApiError::store("fetch company details"))?
    {
        return Ok(ApiResponse::ok(PublicCompany::Profile {
            details: Box::new(details),
            has_detailed_profile: true,
        }));
    }

    // The table may have been deleted; rows outlive it.
    let table = match store.get_table(row.table_id).await {
        Ok(table) => Some(table),
        Err(StoreError::NotFound(_)) => None,
        Err(e) => return Err(ApiError::store("fetch company details")(e)),
    };
    Ok(ApiResponse::ok(PublicCompany::Basic {
        id: row.id,
        name: company_name(table.as_ref(), &row.values),
        basic_data: row.values,
        has_detailed_profile: false,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRow {
    #[serde(flatten)]
    row: Row,
    has_detailed_profile: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTable {
    #[serde(rename = "_id")]
    id: Uuid,
    table_name: String,
    description: String,
    columns: Vec<Column>,
    settings: TableSettings,
}

impl From<&Table> for PublicTable {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id,
            table_name: table.name().to_string(),
            description: table.draft.description.clone(),
            columns: table.columns().to_vec(),
            settings: *table.settings(),
        }
    }
}

/// One listing page with each row marked by whether a profile exists.
pub async fn table(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<IndexMap<String, String>>,
) -> ApiResult<PageResponse<PublicRow, PublicTable>> {
    let query = listing_query(&params)?;
    let id = parse_id(&id, "table")?;
    let store = site.store();
    let table = store.get_table(id).await.map_err(ApiError::store("fetch table"))?;
    let rows = store
        .list_rows(Some(id))
        .await
        .map_err(ApiError::store("fetch table data"))?;
    let cache = DetailsCache::load(store.as_ref())
        .await
        .map_err(ApiError::store("fetch company details"))?;

    let page = listing::apply(table.settings(), rows, &query);
    let annotated = ListingPage {
        rows: page
            .rows
            .into_iter()
            .map(|row| PublicRow {
                has_detailed_profile: cache.has_profile(row.id),
                row,
            })
            .collect(),
        total: page.total,
        page: page.page,
        total_pages: page.total_pages,
    };
    Ok(PageResponse::new(annotated, Some(PublicTable::from(&table))))
}
