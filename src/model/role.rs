use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Administrator = 1,
    Supervisor = 2,
    Employee = 3,
    Guest = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Administrator),
            2 => Some(Role::Supervisor),
            3 => Some(Role::Employee),
            4 => Some(Role::Guest),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Whether a user with this role may be named as a department manager.
    pub fn can_manage_department(self) -> bool {
        match self {
            Role::Administrator | Role::Supervisor => true,
            Role::Employee | Role::Guest => false,
        }
    }

    /// Department membership rule per role: `Some(true)` required,
    /// `Some(false)` forbidden, `None` optional.
    pub fn requires_department(self) -> Option<bool> {
        match self {
            Role::Supervisor | Role::Employee => Some(true),
            Role::Guest => Some(false),
            Role::Administrator => None,
        }
    }
}
