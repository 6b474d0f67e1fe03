use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiJson, ApiQuery, ApiResponse, parse_id, required_param};
use crate::Site;
use crate::details::CompanyDetails;
use crate::errors::{ApiError, ApiResult};
use crate::validation::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyQuery {
    company_id: Option<String>,
}

/// All documents, most recently updated first, or the one for `?companyId=`.
pub async fn list(
    State(site): State<Site>,
    ApiQuery(query): ApiQuery<CompanyQuery>,
) -> ApiResult<Response> {
    let store = site.store();
    if let Some(raw) = query.company_id.as_deref() {
        let company_id = parse_id(raw, "company")?;
        let details = store
            .find_details_by_company(company_id)
            .await
            .map_err(ApiError::store("fetch company details"))?
            .ok_or(ApiError::NotFound("company details"))?;
        return Ok(ApiResponse::ok(details).into_response());
    }

    let mut all = store
        .list_details()
        .await
        .map_err(ApiError::store("fetch company details"))?;
    all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let count = all.len();
    Ok(ApiResponse::ok(all).with_count(count).into_response())
}

pub async fn create(
    State(site): State<Site>,
    ApiJson(mut details): ApiJson<CompanyDetails>,
) -> ApiResult<ApiResponse<CompanyDetails>> {
    details.validate()?;
    details.id = None;
    let saved = site
        .store()
        .insert_details(details)
        .await
        .map_err(ApiError::store("create company details"))?;
    tracing::info!(company = %saved.company_id, "Company details created");
    Ok(ApiResponse::created(saved).with_message("Company details created successfully"))
}

async fn replace(site: &Site, id: Uuid, details: CompanyDetails) -> ApiResult<ApiResponse<CompanyDetails>> {
    details.validate()?;
    let saved = site
        .store()
        .update_details(id, details)
        .await
        .map_err(ApiError::store("update company details"))?;
    Ok(ApiResponse::ok(saved).with_message("Company details updated successfully"))
}

/// Collection-level update; the document id travels in the body.
pub async fn update_from_body(
    State(site): State<Site>,
    ApiJson(details): ApiJson<CompanyDetails>,
) -> ApiResult<ApiResponse<CompanyDetails>> {
    let id = details
        .id
        .ok_or_else(|| ApiError::BadRequest("Company details ID is required for updates".into()))?;
    replace(&site, id, details).await
}

pub async fn remove_by_company(
    State(site): State<Site>,
    ApiQuery(query): ApiQuery<CompanyQuery>,
) -> ApiResult<ApiResponse<()>> {
    let company_id = parse_id(required_param(query.company_id.as_deref(), "Company")?, "company")?;
    let store = site.store();
    let details = store
        .find_details_by_company(company_id)
        .await
        .map_err(ApiError::store("delete company details"))?
        .ok_or(ApiError::NotFound("company details"))?;
    if let Some(id) = details.id {
        store
            .delete_details(id)
            .await
            .map_err(ApiError::store("delete company details"))?;
    }
    Ok(ApiResponse::message("Company details deleted successfully"))
}

pub async fn fetch(
    State(site): State<Site>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CompanyDetails>> {
    let id = parse_id(&id, "company details")?;
    let details = site
        .store()
        .get_details(id)
        .await
        .map_err(ApiError::store("fetch company details"))?;
    Ok(ApiResponse::ok(details))
}

pub async fn update(
    State(site): State<Site>,
    Path(id): Path<String>,
    ApiJson(details): ApiJson<CompanyDetails>,
) -> ApiResult<ApiResponse<CompanyDetails>> {
    let id = parse_id(&id, "company details")?;
    replace(&site, id, details).await
}

pub async fn remove(State(site): State<Site>, Path(id): Path<String>) -> ApiResult<ApiResponse<()>> {
    let id = parse_id(&id, "company details")?;
    site.store()
        .delete_details(id)
        .await
        .map_err(ApiError::store("delete company details"))?;
    Ok(ApiResponse::message("Company details deleted successfully"))
}
