//! In-memory backend used by tests and `STORAGE_BACKEND=memory`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{AttendanceStore, AuditSink, IdentityStore, StoreError, StoreResult};
use crate::model::{
    DepartmentId, RecordId, UserId,
    attendance::{AttendanceRecord, AttendanceStatus, DateRange, NewAttendance, hours_between},
    audit::AuditEntry,
    department::{Department, NewDepartment},
    user::{NewUser, Profile, User},
};

fn lock<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
}

#[derive(Default)]
struct Identities {
    users: BTreeMap<UserId, User>,
    departments: BTreeMap<DepartmentId, Department>,
    next_user_id: UserId,
    next_department_id: DepartmentId,
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<Identities>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(lock(&self.inner)?.users.get(&id).cloned())
    }

    async fn list_users(&self, department: Option<DepartmentId>) -> StoreResult<Vec<User>> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .users
            .values()
            .filter(|u| department.is_none() || u.department_id == department)
            .cloned()
            .collect())
    }

    async fn insert_user(&self, new: &NewUser) -> StoreResult<User> {
        let mut inner = lock(&self.inner)?;
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            role: new.role,
            department_id: new.department_id,
            active: true,
            profile: Profile {
                full_name: new.profile.full_name.trim().to_string(),
                email: new.profile.email.trim().to_string(),
                position: new.profile.position.clone(),
            },
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_department(
        &self,
        id: UserId,
        department: Option<DepartmentId>,
    ) -> StoreResult<bool> {
        let mut inner = lock(&self.inner)?;
        Ok(match inner.users.get_mut(&id) {
            Some(user) => {
                user.department_id = department;
                true
            }
            None => false,
        })
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> StoreResult<bool> {
        let mut inner = lock(&self.inner)?;
        Ok(match inner.users.get_mut(&id) {
            Some(user) => {
                user.active = active;
                true
            }
            None => false,
        })
    }

    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>> {
        Ok(lock(&self.inner)?.departments.get(&id).cloned())
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        Ok(lock(&self.inner)?.departments.values().cloned().collect())
    }

    async fn insert_department(&self, new: &NewDepartment) -> StoreResult<Department> {
        let mut inner = lock(&self.inner)?;
        inner.next_department_id += 1;
        let department = Department {
            id: inner.next_department_id,
            name: new.name.trim().to_string(),
            manager_id: new.manager_id,
            active: true,
        };
        inner.departments.insert(department.id, department.clone());
        Ok(department)
    }

    async fn set_department_active(&self, id: DepartmentId, active: bool) -> StoreResult<bool> {
        let mut inner = lock(&self.inner)?;
        Ok(match inner.departments.get_mut(&id) {
            Some(department) => {
                department.active = active;
                true
            }
            None => false,
        })
    }

    async fn set_department_manager(
        &self,
        id: DepartmentId,
        manager: Option<UserId>,
    ) -> StoreResult<bool> {
        let mut inner = lock(&self.inner)?;
        Ok(match inner.departments.get_mut(&id) {
            Some(department) => {
                department.manager_id = manager;
                true
            }
            None => false,
        })
    }
}

#[derive(Default)]
struct Ledger {
    records: HashMap<(UserId, NaiveDate), AttendanceRecord>,
    next_id: RecordId,
}

#[derive(Default)]
pub struct MemoryAttendanceStore {
    inner: Mutex<Ledger>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records held, for uniqueness checks in tests.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|l| l.records.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn insert_if_absent(&self, new: NewAttendance) -> StoreResult<Option<AttendanceRecord>> {
        let mut inner = lock(&self.inner)?;
        let key = (new.user_id, new.date);
        if inner.records.contains_key(&key) {
            return Ok(None);
        }
        inner.next_id += 1;
        let record = AttendanceRecord {
            id: inner.next_id,
            user_id: new.user_id,
            date: new.date,
            clock_in: Some(new.clock_in),
            clock_out: None,
            status: AttendanceStatus::Open,
            hours_worked: None,
            location: new.location,
        };
        inner.records.insert(key, record.clone());
        Ok(Some(record))
    }

    async fn close_if_open(
        &self,
        user_id: UserId,
        date: NaiveDate,
        clock_out: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut inner = lock(&self.inner)?;
        let Some(record) = inner.records.get_mut(&(user_id, date)) else {
            return Ok(None);
        };
        match record.clock_in {
            Some(clock_in) if record.is_open() && clock_in < clock_out => {
                record.clock_out = Some(clock_out);
                record.status = AttendanceStatus::Closed;
                record.hours_worked = Some(hours_between(clock_in, clock_out));
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(lock(&self.inner)?.records.get(&(user_id, date)).cloned())
    }

    async fn list(
        &self,
        users: Option<&[UserId]>,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let inner = lock(&self.inner)?;
        let mut records: Vec<_> = inner
            .records
            .values()
            .filter(|r| range.contains(r.date))
            .filter(|r| users.is_none_or(|ids| ids.contains(&r.user_id)))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.date, r.user_id));
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        lock(&self.entries)?.push(entry.clone());
        Ok(())
    }
}
