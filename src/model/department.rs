use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DepartmentId, FieldError, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Department {
    #[schema(example = 1)]
    pub id: DepartmentId,
    #[schema(example = "Operations")]
    pub name: String,
    /// Supervisor (or administrator) governing every member of the department.
    #[schema(example = 12, nullable = true)]
    pub manager_id: Option<UserId>,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDepartment {
    #[schema(example = "Operations")]
    pub name: String,
    #[schema(example = 12, nullable = true)]
    pub manager_id: Option<UserId>,
}

impl NewDepartment {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        } else if name.chars().count() > 100 {
            errors.push(FieldError::new("name", "must be at most 100 characters"));
        }
        errors
    }
}
