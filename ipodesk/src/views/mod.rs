use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::Site;
use crate::errors::{ApiError, ApiResult};
use crate::listing::{Direction, ListingQuery, SortState};
use crate::schema::Table;
use crate::value::RowValues;

mod companies;
mod company_details;
mod public;
mod table_data;
mod tables;

pub const UNNAMED_COMPANY: &str = "Unnamed Company";

pub fn router() -> Router<Site> {
    Router::new()
        .route("/api/tables", get(tables::list).post(tables::create))
        .route("/api/tables/reorder", put(tables::reorder))
        .route(
            "/api/tables/{id}",
            get(tables::fetch).put(tables::update).delete(tables::remove),
        )
        .route("/api/tables/{id}/rows", get(tables::rows))
        .route("/api/tables/{id}/export", get(tables::export))
        .route("/api/tables/{id}/form", get(tables::form))
        .route("/api/table-data", get(table_data::list).post(table_data::create))
        .route("/api/table-data/batch", post(table_data::batch))
        .route(
            "/api/table-data/{id}",
            get(table_data::fetch)
                .put(table_data::update)
                .delete(table_data::remove),
        )
        .route(
            "/api/company-details",
            get(company_details::list)
                .post(company_details::create)
                .put(company_details::update_from_body)
                .delete(company_details::remove_by_company),
        )
        .route(
            "/api/company-details/{id}",
            get(company_details::fetch)
                .put(company_details::update)
                .delete(company_details::remove),
        )
        .route("/api/companies", get(companies::list))
        .route("/api/public/company/{id}", get(public::company))
        .route("/api/public/tables/{id}", get(public::table))
}

/// `axum::Json` with rejections rendered in the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with rejections rendered in the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `{success: true, data, count?, message?}`
#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                data: Some(data),
                count: None,
                message: None,
            },
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.body.count = Some(count);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                data: None,
                count: None,
                message: Some(message.into()),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Listing envelope: `{success, data, total, page, totalPages}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T, M = ()> {
    success: bool,
    data: Vec<T>,
    total: usize,
    page: usize,
    total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<M>,
}

impl<T: Serialize, M: Serialize> PageResponse<T, M> {
    pub fn new(page: crate::listing::ListingPage<T>, table: Option<M>) -> Self {
        Self {
            success: true,
            data: page.rows,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
            table,
        }
    }
}

impl<T: Serialize, M: Serialize> IntoResponse for PageResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {what} ID format")))
}

pub fn required_param<'a>(value: Option<&'a str>, what: &str) -> ApiResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{what} ID is required")))
}

/// Reads `search`, `sort`, `dir`, `page` and `f.{column}` parameters.
pub fn listing_query(params: &IndexMap<String, String>) -> ApiResult<ListingQuery> {
    let page = match params.get("page").map(|p| p.trim()).filter(|p| !p.is_empty()) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest("page must be a positive integer".into()))?,
        None => 1,
    };
    let direction = match params.get("dir").map(|d| d.to_ascii_lowercase()) {
        None => Direction::Asc,
        Some(d) if d == "asc" => Direction::Asc,
        Some(d) if d == "desc" => Direction::Desc,
        Some(_) => return Err(ApiError::BadRequest("dir must be 'asc' or 'desc'".into())),
    };
    let sort = params
        .get("sort")
        .filter(|s| !s.is_empty())
        .map(|key| SortState {
            key: key.clone(),
            direction,
        });
    let filters = params
        .iter()
        .filter_map(|(k, v)| k.strip_prefix("f.").map(|col| (col.to_string(), v.clone())))
        .collect();

    Ok(ListingQuery {
        search: params.get("search").cloned(),
        filters,
        sort,
        page,
    })
}

/// Display name of a company row: the table's first column, else the
/// row's first value.
pub fn company_name(table: Option<&Table>, values: &RowValues) -> String {
    let value = match table.and_then(Table::name_column) {
        Some(column) => values.get(&column.name),
        None => values.values().next(),
    };
    value
        .filter(|v| !v.is_blank())
        .map(|v| v.display_text())
        .unwrap_or_else(|| UNNAMED_COMPANY.to_string())
}
