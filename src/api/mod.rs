pub mod admin;
pub mod attendance;
pub mod report;

use actix_web::HttpRequest;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};

use crate::error::AppError;
use crate::model::FieldError;

// Extractor failures answer with the same JSON error body as the handlers.

pub fn json_error(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    AppError::field("body", err.to_string()).into()
}

pub fn query_error(err: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    AppError::field("query", err.to_string()).into()
}

pub fn path_error(err: PathError, _: &HttpRequest) -> actix_web::Error {
    AppError::field("path", err.to_string()).into()
}

/// Parses an optional numeric id query value, recording a field error.
pub fn parse_id_field(
    field: &'static str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<u64> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a positive integer id"));
            None
        }
    }
}
