//! Fixtures shared by unit tests: a small organization on the in-memory
//! stores and a state harness driven by a manual clock.
//!
//! ```text
//! d1 (managed by s1): s1, e1
//! d2 (managed by s2): s2, e2
//! no department:      admin, guest
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::audit::AuditRecorder;
use crate::clock::manual::ManualClock;
use crate::config::{Config, StorageBackend};
use crate::ledger::AttendanceLedger;
use crate::model::{
    DepartmentId, UserId,
    attendance::NewAttendance,
    department::{Department, NewDepartment},
    role::Role,
    user::{NewUser, Profile, User},
};
use crate::report::ReportAggregator;
use crate::state::AppState;
use crate::store::{
    AttendanceStore, IdentityStore,
    memory::{MemoryAttendanceStore, MemoryAuditSink, MemoryIdentityStore},
};

/// 2025-03-10 at the given UTC time.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub struct Org {
    pub identities: Arc<MemoryIdentityStore>,
    pub records: Arc<MemoryAttendanceStore>,
    pub d1: Department,
    pub d2: Department,
    pub admin: User,
    pub s1: User,
    pub s2: User,
    pub e1: User,
    pub e2: User,
    pub guest: User,
}

async fn add_user(
    identities: &MemoryIdentityStore,
    role: Role,
    department_id: Option<DepartmentId>,
    name: &str,
) -> User {
    identities
        .insert_user(&NewUser {
            role,
            department_id,
            profile: Profile {
                full_name: name.to_string(),
                email: format!("{}@company.com", name.to_lowercase()),
                position: None,
            },
        })
        .await
        .unwrap()
}

impl Org {
    pub async fn build() -> Self {
        let identities = Arc::new(MemoryIdentityStore::new());
        let department = |name: &str| NewDepartment {
            name: name.to_string(),
            manager_id: None,
        };
        let mut d1 = identities.insert_department(&department("d1")).await.unwrap();
        let mut d2 = identities.insert_department(&department("d2")).await.unwrap();

        let admin = add_user(&identities, Role::Administrator, None, "Admin").await;
        let s1 = add_user(&identities, Role::Supervisor, Some(d1.id), "S1").await;
        let s2 = add_user(&identities, Role::Supervisor, Some(d2.id), "S2").await;
        let e1 = add_user(&identities, Role::Employee, Some(d1.id), "E1").await;
        let e2 = add_user(&identities, Role::Employee, Some(d2.id), "E2").await;
        let guest = add_user(&identities, Role::Guest, None, "Guest").await;

        identities.set_department_manager(d1.id, Some(s1.id)).await.unwrap();
        identities.set_department_manager(d2.id, Some(s2.id)).await.unwrap();
        d1.manager_id = Some(s1.id);
        d2.manager_id = Some(s2.id);

        Self {
            identities,
            records: Arc::new(MemoryAttendanceStore::new()),
            d1,
            d2,
            admin,
            s1,
            s2,
            e1,
            e2,
            guest,
        }
    }

    pub async fn add_employee(&self, department_id: DepartmentId, name: &str) -> User {
        add_user(&self.identities, Role::Employee, Some(department_id), name).await
    }

    pub async fn deactivate_department(&self, department_id: DepartmentId) {
        self.identities
            .set_department_active(department_id, false)
            .await
            .unwrap();
    }

    /// Stores a closed record: 09:00 on `date` plus `minutes` of work.
    pub async fn worked(&self, user_id: UserId, date: NaiveDate, minutes: i64) {
        let clock_in = Utc.from_utc_datetime(&date.and_hms_opt(9, 0, 0).unwrap());
        self.records
            .insert_if_absent(NewAttendance {
                user_id,
                date,
                clock_in,
                location: None,
            })
            .await
            .unwrap()
            .unwrap();
        self.records
            .close_if_open(user_id, date, clock_in + Duration::minutes(minutes))
            .await
            .unwrap()
            .unwrap();
    }

    pub fn reports(&self) -> ReportAggregator {
        let ledger = AttendanceLedger::new(
            self.records.clone(),
            self.identities.clone(),
            Arc::new(ManualClock::new(at(9, 0))),
        );
        ReportAggregator::new(self.identities.clone(), Arc::new(ledger))
    }
}

/// Fully wired [`AppState`] over an [`Org`], with handles for inspection.
pub struct Harness {
    pub org: Org,
    pub clock: Arc<ManualClock>,
    pub audit_sink: Arc<MemoryAuditSink>,
    pub state: Arc<AppState>,
    pub audit: AuditRecorder,
}

impl Harness {
    pub async fn new() -> Self {
        let org = Org::build().await;
        let clock = Arc::new(ManualClock::new(at(9, 0)));
        let audit_sink = Arc::new(MemoryAuditSink::new());
        let state = Arc::new(AppState::new(
            org.identities.clone(),
            org.records.clone(),
            audit_sink.clone(),
            clock.clone(),
            64,
        ));

        Self {
            audit: state.audit.clone(),
            org,
            clock,
            audit_sink,
            state,
        }
    }
}

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".into(),
        storage_backend: StorageBackend::Memory,
        database_url: None,
        run_migrations: false,
        jwt_secret: TEST_SECRET.into(),
        rate_protected_per_min: 1000,
        audit_queue_capacity: 64,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
    }
}
