use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

use super::{AttendanceStore, AuditSink, IdentityStore, StoreError, StoreResult};
use crate::model::{
    DepartmentId, UserId,
    attendance::{AttendanceRecord, AttendanceStatus, DateRange, NewAttendance},
    audit::AuditEntry,
    department::{Department, NewDepartment},
    role::Role,
    user::{NewUser, Profile, User},
};

/// MySQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    role_id: u8,
    department_id: Option<u64>,
    active: bool,
    full_name: String,
    email: String,
    position: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has role id {}", row.id, row.role_id)))?;
        Ok(User {
            id: row.id,
            role,
            department_id: row.department_id,
            active: row.active,
            profile: Profile {
                full_name: row.full_name,
                email: row.email,
                position: row.position,
            },
        })
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    id: u64,
    name: String,
    manager_id: Option<u64>,
    active: bool,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            manager_id: row.manager_id,
            active: row.active,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: u64,
    date: NaiveDate,
    clock_in: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    status: String,
    hours_worked: Option<f64>,
    location: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| {
            StoreError::Corrupt(format!("attendance {} has status '{}'", row.id, row.status))
        })?;
        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            status,
            hours_worked: row.hours_worked,
            location: row.location,
        })
    }
}

const USER_COLUMNS: &str = "id, role_id, department_id, active, full_name, email, position";
const ATTENDANCE_COLUMNS: &str =
    "id, user_id, date, clock_in, clock_out, status, hours_worked, location";

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, department: Option<DepartmentId>) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE (? IS NULL OR department_id = ?) ORDER BY id"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(department)
            .bind(department)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn insert_user(&self, new: &NewUser) -> StoreResult<User> {
        let profile = Profile {
            full_name: new.profile.full_name.trim().to_string(),
            email: new.profile.email.trim().to_string(),
            position: new.profile.position.clone(),
        };
        let result = sqlx::query(
            r#"
            INSERT INTO users (role_id, department_id, active, full_name, email, position)
            VALUES (?, ?, TRUE, ?, ?, ?)
            "#,
        )
        .bind(new.role.id())
        .bind(new.department_id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.position)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_id(),
            role: new.role,
            department_id: new.department_id,
            active: true,
            profile,
        })
    }

    async fn set_user_department(
        &self,
        id: UserId,
        department: Option<DepartmentId>,
    ) -> StoreResult<bool> {
        // rows_affected is 0 for an unchanged value, so check existence instead.
        let exists = self.get_user(id).await?.is_some();
        if exists {
            sqlx::query("UPDATE users SET department_id = ? WHERE id = ?")
                .bind(department)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(exists)
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> StoreResult<bool> {
        let exists = self.get_user(id).await?.is_some();
        if exists {
            sqlx::query("UPDATE users SET active = ? WHERE id = ?")
                .bind(active)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(exists)
    }

    async fn get_department(&self, id: DepartmentId) -> StoreResult<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, manager_id, active FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Department::from))
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, manager_id, active FROM departments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn insert_department(&self, new: &NewDepartment) -> StoreResult<Department> {
        let name = new.name.trim().to_string();
        let result =
            sqlx::query("INSERT INTO departments (name, manager_id, active) VALUES (?, ?, TRUE)")
                .bind(&name)
                .bind(new.manager_id)
                .execute(&self.pool)
                .await?;

        Ok(Department {
            id: result.last_insert_id(),
            name,
            manager_id: new.manager_id,
            active: true,
        })
    }

    async fn set_department_active(&self, id: DepartmentId, active: bool) -> StoreResult<bool> {
        let exists = self.get_department(id).await?.is_some();
        if exists {
            sqlx::query("UPDATE departments SET active = ? WHERE id = ?")
                .bind(active)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(exists)
    }

    async fn set_department_manager(
        &self,
        id: DepartmentId,
        manager: Option<UserId>,
    ) -> StoreResult<bool> {
        let exists = self.get_department(id).await?.is_some();
        if exists {
            sqlx::query("UPDATE departments SET manager_id = ? WHERE id = ?")
                .bind(manager)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(exists)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert_if_absent(&self, new: NewAttendance) -> StoreResult<Option<AttendanceRecord>> {
        // UNIQUE (user_id, date) makes the insert the uniqueness check.
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (user_id, date, clock_in, status, location)
            VALUES (?, ?, ?, 'open', ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.date)
        .bind(new.clock_in)
        .bind(&new.location)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(AttendanceRecord {
                id: done.last_insert_id(),
                user_id: new.user_id,
                date: new.date,
                clock_in: Some(new.clock_in),
                clock_out: None,
                status: AttendanceStatus::Open,
                hours_worked: None,
                location: new.location,
            })),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn close_if_open(
        &self,
        user_id: UserId,
        date: NaiveDate,
        clock_out: DateTime<Utc>,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET clock_out = ?,
                status = 'closed',
                hours_worked = GREATEST(ROUND(TIMESTAMPDIFF(SECOND, clock_in, ?) / 3600, 2), 0)
            WHERE user_id = ?
            AND date = ?
            AND status = 'open'
            AND clock_in < ?
            "#,
        )
        .bind(clock_out)
        .bind(clock_out)
        .bind(user_id)
        .bind(date)
        .bind(clock_out)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(user_id, date).await
    }

    async fn find(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn list(
        &self,
        users: Option<&[UserId]>,
        range: DateRange,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let mut where_sql = String::from(" WHERE date BETWEEN ? AND ?");
        if let Some(ids) = users {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            where_sql.push_str(&format!(" AND user_id IN ({placeholders})"));
        }

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance{where_sql} ORDER BY date, user_id"
        );
        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(range.start)
            .bind(range.end);
        for id in users.unwrap_or_default() {
            query = query.bind(*id);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl AuditSink for MySqlStore {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, actor_user_id, action, target, occurred_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.actor_user_id)
        .bind(entry.action.as_ref())
        .bind(&entry.target)
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
