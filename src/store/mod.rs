//! Persistence seams for the attendance service.
//!
//! Every store is an async trait so the service can run against MySQL in
//! production and against the in-memory backend in tests or local runs.
//! The attendance store only exposes conditional writes: a clock-in is an
//! insert-if-absent and a clock-out is an update-if-open, both atomic.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{
    DepartmentId, UserId,
    attendance::{AttendanceRecord, DateRange, NewAttendance},
    audit::AuditEntry,
    department::{Department, NewDepartment},
    user::{NewUser, User},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("stored row is invalid: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Users in `department`, or every user when `None`. Includes inactive users.
    async fn list_users(&self, department: Option<DepartmentId>) -> StoreResult<Vec<User>>;

    async fn insert_user(&self, new: &NewUser) -> StoreResult<User>;

    /// Returns `false` when the user does not exist.
    async fn set_user_department(
        &self,
        id: UserId,
        department: Option<DepartmentId>,
    ) -> StoreResult<bool>;

    /// Returns `false` when the user does not exist.
    async fn set_user_active(&self, id: UserId, active: bool) -> StoreResult<bool>;

    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>>;

    async fn list_departments(&self) -> StoreResult<Vec<Department>>;

    async fn insert_department(&self, new: &NewDepartment) -> StoreResult<Department>;

    /// Returns `false` when the department does not exist.
    async fn set_department_active(&self, id: DepartmentId, active: bool) -> StoreResult<bool>;

    /// Returns `false` when the department does not exist.
    async fn set_department_manager(
        &self,
        id: DepartmentId,
        manager: Option<UserId>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts an open record unless one already exists for the same
    /// (user, date). Returns `None` when a record was already there.
    async fn insert_if_absent(&self, new: NewAttendance) -> StoreResult<Option<AttendanceRecord>>;

    /// Closes the open record for (user, date) provided `clock_out` is after
    /// its clock-in. Returns `None` when no record matched.
    async fn close_if_open(
        &self,
        user_id: UserId,
        date: NaiveDate,
        clock_out: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceRecord>>;

    async fn find(&self, user_id: UserId, date: NaiveDate)
    -> StoreResult<Option<AttendanceRecord>>;

    /// Records in `range`, restricted to `users` when given, ordered by date then user.
    async fn list(
        &self,
        users: Option<&[UserId]>,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()>;
}
