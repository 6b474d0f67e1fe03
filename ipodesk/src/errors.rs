use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::contract::ContractError;
use crate::store::StoreError;
use crate::validation::{ValidationIssue, ValidationReport};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(ValidationReport),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("table definition cannot produce a row contract: {0}")]
    Contract(#[from] ContractError),

    #[error("failed to {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationIssue>>,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ApiError {
    /// `map_err` adapter that tags a store failure with the operation.
    pub fn store(op: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| ApiError::Store { op, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Contract(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store { source, .. } => source.status_code(),
        }
    }

    /// What the client sees. Server-side causes stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(what) => format!("{} not found", capitalize(what)),
            ApiError::Store { source: StoreError::NotFound(what), .. } => {
                format!("{} not found", capitalize(what))
            }
            ApiError::Store { source: StoreError::Conflict(msg), .. } => msg.clone(),
            ApiError::Store { op, .. } => format!("Failed to {op}"),
            ApiError::Contract(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = self.public_message();
        let details = match self {
            ApiError::Validation(report) => Some(report.issues),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: &message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationReport> for ApiError {
    fn from(report: ValidationReport) -> Self {
        ApiError::Validation(report)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn validation_errors_carry_details() {
        let mut report = ValidationReport::empty();
        report.push("tableName", ValidationError::new("min_length", "too short"));
        let (status, body) = body_json(ApiError::Validation(report)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "tableName");
    }

    #[tokio::test]
    async fn store_failures_hide_the_cause() {
        let err = ApiError::store("fetch tables")(StoreError::Fatal("connection reset".into()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch tables");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn store_not_found_and_conflict_pass_through() {
        let (status, body) = body_json(ApiError::store("fetch table")(StoreError::NotFound("table"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Table not found");

        let conflict = StoreError::Conflict("A table named 'x' already exists".into());
        let (status, body) = body_json(ApiError::store("create table")(conflict)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A table named 'x' already exists");
    }
}
