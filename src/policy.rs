//! Role and department based access decisions.
//!
//! [`evaluate`] is a pure function of caller, action and resolved scope.
//! [`AuthorizationPolicy`] resolves a [`Target`] into a [`Scope`] through the
//! identity store (user -> department -> manager) and then evaluates it.

use std::sync::Arc;

use strum_macros::Display;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::model::{DepartmentId, UserId, role::Role, user::User};
use crate::store::{IdentityStore, StoreResult};

pub const INSUFFICIENT_PRIVILEGE: &str = "insufficient privilege";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum Action {
    ClockIn,
    ClockOut,
    ReadRecords,
    /// Approve or reject a department member's records.
    ReviewRecords,
    /// Organization-wide aggregate counts.
    ViewSnapshot,
    CreateUser,
    DeactivateUser,
    AssignDepartment,
    ManageDepartment,
}

impl Action {
    /// Actions anyone but a guest may take on their own records.
    pub fn is_self_scoped(self) -> bool {
        match self {
            Action::ClockIn | Action::ClockOut | Action::ReadRecords => true,
            Action::ReviewRecords
            | Action::ViewSnapshot
            | Action::CreateUser
            | Action::DeactivateUser
            | Action::AssignDepartment
            | Action::ManageDepartment => false,
        }
    }

    /// Actions a supervisor may take on members of a department they manage.
    pub fn is_department_scoped(self) -> bool {
        match self {
            Action::ReadRecords | Action::ReviewRecords => true,
            Action::ClockIn
            | Action::ClockOut
            | Action::ViewSnapshot
            | Action::CreateUser
            | Action::DeactivateUser
            | Action::AssignDepartment
            | Action::ManageDepartment => false,
        }
    }

    pub fn is_read_only(self) -> bool {
        match self {
            Action::ReadRecords | Action::ViewSnapshot => true,
            Action::ClockIn
            | Action::ClockOut
            | Action::ReviewRecords
            | Action::CreateUser
            | Action::DeactivateUser
            | Action::AssignDepartment
            | Action::ManageDepartment => false,
        }
    }
}

/// What an action is aimed at.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Target {
    User(UserId),
    Department(DepartmentId),
    Organization,
}

/// An authenticated caller, as loaded from the identity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub active: bool,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Caller {
            id: user.id,
            role: user.role,
            department_id: user.department_id,
            active: user.active,
        }
    }
}

/// Relationships of a target relevant to a decision. Unknown targets resolve
/// to the empty scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub owner: Option<UserId>,
    pub department_manager: Option<UserId>,
    pub organization: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn evaluate(caller: &Caller, action: Action, scope: &Scope) -> Decision {
    if !caller.active {
        return Decision::Deny(INSUFFICIENT_PRIVILEGE);
    }

    let is_own = scope.owner == Some(caller.id);
    let manages_target = scope.department_manager == Some(caller.id);
    let organization_aggregate = scope.organization && action == Action::ViewSnapshot;

    let allowed = match caller.role {
        Role::Administrator => true,
        Role::Supervisor => {
            (is_own && action.is_self_scoped())
                || (manages_target && action.is_department_scoped())
                || organization_aggregate
        }
        Role::Employee => is_own && action.is_self_scoped(),
        Role::Guest => (is_own && action.is_read_only()) || organization_aggregate,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(INSUFFICIENT_PRIVILEGE)
    }
}

pub struct AuthorizationPolicy {
    identities: Arc<dyn IdentityStore>,
}

impl AuthorizationPolicy {
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self { identities }
    }

    /// Follows user -> department -> manager. Inactive departments grant no
    /// supervisory scope.
    pub async fn resolve(&self, target: Target) -> StoreResult<Scope> {
        match target {
            Target::Organization => Ok(Scope {
                organization: true,
                ..Scope::default()
            }),
            Target::Department(department_id) => Ok(Scope {
                department_manager: self.active_manager_of(department_id).await?,
                ..Scope::default()
            }),
            Target::User(user_id) => {
                let Some(user) = self.identities.get_user(user_id).await? else {
                    return Ok(Scope::default());
                };
                let department_manager = match user.department_id {
                    Some(department_id) => self.active_manager_of(department_id).await?,
                    None => None,
                };
                Ok(Scope {
                    owner: Some(user.id),
                    department_manager,
                    organization: false,
                })
            }
        }
    }

    async fn active_manager_of(&self, department_id: DepartmentId) -> StoreResult<Option<UserId>> {
        Ok(self
            .identities
            .get_department(department_id)
            .await?
            .filter(|d| d.active)
            .and_then(|d| d.manager_id))
    }

    pub async fn decide(&self, caller: &Caller, action: Action, target: Target) -> StoreResult<Decision> {
        let scope = self.resolve(target).await?;
        Ok(evaluate(caller, action, &scope))
    }

    /// Fails with [`AppError::AuthorizationDenied`] unless the caller may act.
    #[instrument(
        level = "debug",
        skip(self, caller),
        fields(caller_id = caller.id, role = %caller.role)
    )]
    pub async fn authorize(&self, caller: &Caller, action: Action, target: Target) -> AppResult<()> {
        match self.decide(caller, action, target).await? {
            Decision::Allow => {
                debug!("Access granted");
                Ok(())
            }
            Decision::Deny(reason) => {
                info!(reason, "Access denied");
                Err(AppError::AuthorizationDenied)
            }
        }
    }
}
