pub mod attendance;
pub mod audit;
pub mod department;
pub mod role;
pub mod user;

use serde::Serialize;
use utoipa::ToSchema;

pub type UserId = u64;
pub type DepartmentId = u64;
pub type RecordId = u64;

/// A validation message tied to the input field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "from")]
    pub field: &'static str,
    #[schema(example = "must be a date formatted YYYY-MM-DD")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
