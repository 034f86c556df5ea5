use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DepartmentId, FieldError, UserId, role::Role};

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 7,
    "role": "employee",
    "department_id": 1,
    "active": true,
    "profile": {
        "full_name": "John Doe",
        "email": "john.doe@company.com",
        "position": "Technician"
    }
}))]
pub struct User {
    pub id: UserId,
    pub role: Role,
    /// Absent for administrators and guests.
    pub department_id: Option<DepartmentId>,
    pub active: bool,
    pub profile: Profile,
}

/// Personal and employment details kept with a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "Technician", nullable = true)]
    pub position: Option<String>,
}

impl Profile {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let name = self.full_name.trim();
        if name.is_empty() {
            errors.push(FieldError::new("profile.full_name", "must not be empty"));
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.push(FieldError::new(
                "profile.full_name",
                "must be at most 100 characters",
            ));
        }

        if !is_plausible_email(&self.email) {
            errors.push(FieldError::new("profile.email", "must be a valid email address"));
        }

        if let Some(position) = &self.position {
            if position.chars().count() > MAX_NAME_LEN {
                errors.push(FieldError::new(
                    "profile.position",
                    "must be at most 100 characters",
                ));
            }
        }

        errors
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.trim().split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !domain.starts_with('.')
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub role: Role,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<DepartmentId>,
    pub profile: Profile,
}

impl NewUser {
    /// Checks the payload shape. Whether the department exists is checked
    /// against the identity store by the caller.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = self.profile.validate();

        match (self.role.requires_department(), self.department_id) {
            (Some(true), None) => errors.push(FieldError::new(
                "department_id",
                "is required for this role",
            )),
            (Some(false), Some(_)) => errors.push(FieldError::new(
                "department_id",
                "must be empty for guests",
            )),
            _ => {}
        }

        errors
    }
}
