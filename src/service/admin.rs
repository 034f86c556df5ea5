use std::sync::Arc;

use tracing::{info, instrument};

use crate::audit::AuditRecorder;
use crate::error::{AppError, AppResult};
use crate::model::{
    DepartmentId, UserId,
    audit::AuditAction,
    department::{Department, NewDepartment},
    user::{NewUser, User},
};
use crate::policy::{Action, AuthorizationPolicy, Caller, Target};
use crate::store::IdentityStore;

fn user_path(id: UserId) -> String {
    format!("/users/{id}")
}

fn department_path(id: DepartmentId) -> String {
    format!("/departments/{id}")
}

/// Administrative changes to users and departments.
pub struct AdminService {
    identities: Arc<dyn IdentityStore>,
    policy: Arc<AuthorizationPolicy>,
    audit: AuditRecorder,
}

impl AdminService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        policy: Arc<AuthorizationPolicy>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            identities,
            policy,
            audit,
        }
    }

    async fn active_department(&self, id: DepartmentId) -> AppResult<Department> {
        self.identities
            .get_department(id)
            .await?
            .filter(|d| d.active)
            .ok_or_else(|| AppError::NotFound("department".into()))
    }

    /// A manager must be an active supervisor or administrator.
    async fn check_manager(&self, manager_id: UserId) -> AppResult<()> {
        let manager = self
            .identities
            .get_user(manager_id)
            .await?
            .ok_or_else(|| AppError::NotFound("manager".into()))?;
        if !manager.active || !manager.role.can_manage_department() {
            return Err(AppError::field(
                "manager_id",
                "must be an active supervisor or administrator",
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, caller, new), fields(caller_id = caller.id, role = %new.role))]
    pub async fn create_user(&self, caller: &Caller, new: NewUser) -> AppResult<User> {
        self.policy
            .authorize(caller, Action::CreateUser, Target::Organization)
            .await?;

        let errors = new.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if let Some(department_id) = new.department_id {
            self.active_department(department_id).await?;
        }

        let user = self.identities.insert_user(&new).await?;
        self.audit
            .record(Some(caller.id), AuditAction::CreateUser, user_path(user.id));
        info!(user_id = user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn deactivate_user(&self, caller: &Caller, user_id: UserId) -> AppResult<()> {
        self.policy
            .authorize(caller, Action::DeactivateUser, Target::User(user_id))
            .await?;

        if user_id == caller.id {
            return Err(AppError::InvalidState("cannot deactivate your own account".into()));
        }
        // A department manager must stay an active user.
        if let Some(department) = self
            .identities
            .list_departments()
            .await?
            .into_iter()
            .find(|d| d.manager_id == Some(user_id))
        {
            return Err(AppError::InvalidState(format!(
                "user manages department {}, assign another manager first",
                department.id
            )));
        }
        if !self.identities.set_user_active(user_id, false).await? {
            return Err(AppError::NotFound("user".into()));
        }

        self.audit
            .record(Some(caller.id), AuditAction::DeactivateUser, user_path(user_id));
        info!(user_id, "User deactivated");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn assign_department(
        &self,
        caller: &Caller,
        user_id: UserId,
        department_id: Option<DepartmentId>,
    ) -> AppResult<User> {
        self.policy
            .authorize(caller, Action::AssignDepartment, Target::User(user_id))
            .await?;

        let mut user = self
            .identities
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;

        match (user.role.requires_department(), department_id) {
            (Some(true), None) => {
                return Err(AppError::field("department_id", "is required for this role"));
            }
            (Some(false), Some(_)) => {
                return Err(AppError::field("department_id", "must be empty for guests"));
            }
            _ => {}
        }
        if let Some(department_id) = department_id {
            self.active_department(department_id).await?;
        }

        if !self.identities.set_user_department(user_id, department_id).await? {
            return Err(AppError::NotFound("user".into()));
        }
        user.department_id = department_id;

        self.audit
            .record(Some(caller.id), AuditAction::AssignDepartment, user_path(user_id));
        info!(user_id, department_id = ?department_id, "Department assigned");
        Ok(user)
    }

    #[instrument(skip(self, caller, new), fields(caller_id = caller.id))]
    pub async fn create_department(
        &self,
        caller: &Caller,
        new: NewDepartment,
    ) -> AppResult<Department> {
        self.policy
            .authorize(caller, Action::ManageDepartment, Target::Organization)
            .await?;

        let errors = new.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if let Some(manager_id) = new.manager_id {
            self.check_manager(manager_id).await?;
        }

        let department = self.identities.insert_department(&new).await?;
        self.audit.record(
            Some(caller.id),
            AuditAction::CreateDepartment,
            department_path(department.id),
        );
        info!(department_id = department.id, "Department created");
        Ok(department)
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn deactivate_department(
        &self,
        caller: &Caller,
        department_id: DepartmentId,
    ) -> AppResult<()> {
        self.policy
            .authorize(caller, Action::ManageDepartment, Target::Department(department_id))
            .await?;

        if !self.identities.set_department_active(department_id, false).await? {
            return Err(AppError::NotFound("department".into()));
        }

        self.audit.record(
            Some(caller.id),
            AuditAction::DeactivateDepartment,
            department_path(department_id),
        );
        info!(department_id, "Department deactivated");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn set_department_manager(
        &self,
        caller: &Caller,
        department_id: DepartmentId,
        manager_id: Option<UserId>,
    ) -> AppResult<Department> {
        self.policy
            .authorize(caller, Action::ManageDepartment, Target::Department(department_id))
            .await?;

        let mut department = self
            .identities
            .get_department(department_id)
            .await?
            .ok_or_else(|| AppError::NotFound("department".into()))?;
        if let Some(manager_id) = manager_id {
            self.check_manager(manager_id).await?;
        }

        if !self
            .identities
            .set_department_manager(department_id, manager_id)
            .await?
        {
            return Err(AppError::NotFound("department".into()));
        }
        department.manager_id = manager_id;

        self.audit.record(
            Some(caller.id),
            AuditAction::SetDepartmentManager,
            department_path(department_id),
        );
        info!(department_id, manager_id = ?manager_id, "Department manager set");
        Ok(department)
    }
}
