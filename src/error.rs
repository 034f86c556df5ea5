use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::model::FieldError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    /// Deliberately carries no detail about the target.
    #[error("insufficient privilege")]
    AuthorizationDenied,

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage unavailable, retry later")]
    StorageUnavailable(String),

    #[error("internal server error")]
    Internal(String),

    #[error("{0}")]
    Unauthenticated(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(detail) => AppError::StorageUnavailable(detail),
            StoreError::Corrupt(detail) => AppError::Internal(detail),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Conflict(reason) => AppError::Conflict(reason),
            LedgerError::InvalidState(reason) => AppError::InvalidState(reason),
            LedgerError::Store(store) => store.into(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthorizationDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::StorageUnavailable(detail) | AppError::Internal(detail) => {
                tracing::error!(error = %detail, status = %self.status_code(), "Request failed");
            }
            _ => {}
        }

        let body = match self {
            AppError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn validation_errors_list_each_field() {
        let err = AppError::Validation(vec![
            FieldError::new("from", "bad"),
            FieldError::new("to", "worse"),
        ]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"][1]["field"], "to");
    }

    #[actix_web::test]
    async fn denial_does_not_leak_detail() {
        let body = to_bytes(AppError::AuthorizationDenied.error_response().into_body())
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "message": "insufficient privilege" }));
    }

    #[test]
    fn storage_errors_map_to_service_unavailable() {
        let err: AppError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
