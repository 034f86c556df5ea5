//! Read-only attendance statistics.
//!
//! Reports never fail because of missing attendance data: a user without
//! records, or whose records cannot be loaded, simply gets zeroed fields.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::ledger::AttendanceLedger;
use crate::model::{
    DepartmentId, UserId,
    attendance::{AttendanceRecord, AttendanceStatus, DateRange, round2},
    user::User,
};
use crate::policy::{Action, Caller, Scope, evaluate};
use crate::store::IdentityStore;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserSummary {
    pub user_id: UserId,
    pub full_name: String,
    pub department_id: Option<DepartmentId>,
    /// Days in range with any record.
    pub days_recorded: u32,
    pub days_closed: u32,
    /// Days in range without a record.
    pub absences: u32,
    pub total_hours: f64,
    /// Mean hours over closed days.
    pub average_hours: f64,
    /// Closed days over days in range, as a whole percentage.
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Summary {
    pub range: DateRange,
    pub applicable_days: u32,
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Snapshot {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub total_users: u32,
    pub not_started: u32,
    pub open: u32,
    pub closed: u32,
}

/// `part / whole` as a whole percentage; 0 when `whole` is 0.
pub fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}

fn summarize_user(user: &User, records: &[&AttendanceRecord], applicable_days: u32) -> UserSummary {
    let days_recorded = records.len() as u32;
    let closed: Vec<f64> = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Closed)
        .map(|r| r.hours_worked.unwrap_or(0.0))
        .collect();
    let days_closed = closed.len() as u32;
    let total: f64 = closed.iter().sum();
    let average = if days_closed == 0 {
        0.0
    } else {
        total / f64::from(days_closed)
    };

    UserSummary {
        user_id: user.id,
        full_name: user.profile.full_name.clone(),
        department_id: user.department_id,
        days_recorded,
        days_closed,
        absences: applicable_days.saturating_sub(days_recorded),
        total_hours: round2(total),
        average_hours: round2(average),
        attendance_rate: percent(days_closed, applicable_days),
    }
}

pub struct ReportAggregator {
    identities: Arc<dyn IdentityStore>,
    ledger: Arc<AttendanceLedger>,
}

impl ReportAggregator {
    pub fn new(identities: Arc<dyn IdentityStore>, ledger: Arc<AttendanceLedger>) -> Self {
        Self { identities, ledger }
    }

    /// Active users the caller may read, optionally limited to one department.
    async fn visible_users(
        &self,
        caller: &Caller,
        department: Option<DepartmentId>,
    ) -> AppResult<Vec<User>> {
        let managers: HashMap<DepartmentId, UserId> = self
            .identities
            .list_departments()
            .await?
            .into_iter()
            .filter(|d| d.active)
            .filter_map(|d| d.manager_id.map(|m| (d.id, m)))
            .collect();

        let users = self.identities.list_users(department).await?;
        Ok(users
            .into_iter()
            .filter(|u| u.active)
            .filter(|u| {
                let scope = Scope {
                    owner: Some(u.id),
                    department_manager: u.department_id.and_then(|d| managers.get(&d).copied()),
                    organization: false,
                };
                evaluate(caller, Action::ReadRecords, &scope).is_allowed()
            })
            .collect())
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn summarize(
        &self,
        range: DateRange,
        department: Option<DepartmentId>,
        caller: &Caller,
    ) -> AppResult<Summary> {
        let users = self.visible_users(caller, department).await?;
        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();

        let records = match self.ledger.list_for_users(&ids, range).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Attendance unavailable, reporting zeroed figures");
                Vec::new()
            }
        };

        let mut by_user: HashMap<UserId, Vec<&AttendanceRecord>> = HashMap::new();
        for record in &records {
            by_user.entry(record.user_id).or_default().push(record);
        }

        let applicable_days = range.days();
        let summaries = users
            .iter()
            .map(|user| {
                let own = by_user.get(&user.id).map(Vec::as_slice).unwrap_or_default();
                summarize_user(user, own, applicable_days)
            })
            .collect();

        Ok(Summary {
            range,
            applicable_days,
            users: summaries,
        })
    }

    /// Counts of not-started / open / closed records across all active users.
    #[instrument(skip(self))]
    pub async fn organization_snapshot(&self, date: NaiveDate) -> AppResult<Snapshot> {
        let active: Vec<UserId> = self
            .identities
            .list_users(None)
            .await?
            .into_iter()
            .filter(|u| u.active)
            .map(|u| u.id)
            .collect();

        let records = match self.ledger.list_for_users(&active, DateRange::single(date)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Attendance unavailable, reporting zeroed snapshot");
                Vec::new()
            }
        };

        let open = records.iter().filter(|r| r.is_open()).count() as u32;
        let closed = records.len() as u32 - open;
        let total_users = active.len() as u32;

        Ok(Snapshot {
            date,
            total_users,
            not_started: total_users.saturating_sub(open + closed),
            open,
            closed,
        })
    }
}
