use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ClockIn,
    ClockOut,
    CreateUser,
    DeactivateUser,
    AssignDepartment,
    CreateDepartment,
    DeactivateDepartment,
    SetDepartmentManager,
}

/// One row of the append-only audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// `None` for actions performed by the system itself.
    pub actor_user_id: Option<UserId>,
    pub action: AuditAction,
    pub target: String,
    pub occurred_at: DateTime<Utc>,
}
