use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::audit::AuditRecorder;
use crate::error::{AppError, AppResult};
use crate::ledger::{AttendanceLedger, MAX_LOCATION_LEN};
use crate::model::{
    DepartmentId, UserId,
    attendance::{AttendanceRecord, DateRange},
    audit::AuditAction,
    role::Role,
};
use crate::policy::{Action, AuthorizationPolicy, Caller, Target};
use crate::report::{ReportAggregator, Snapshot, Summary};

pub fn attendance_path(user_id: UserId, date: NaiveDate) -> String {
    format!("/attendance/{user_id}/{date}")
}

/// Filters accepted by [`AttendanceService::list`].
#[derive(Debug, Clone)]
pub struct AttendanceQuery {
    pub user_id: Option<UserId>,
    pub department_id: Option<DepartmentId>,
    pub range: DateRange,
}

pub struct AttendanceService {
    policy: Arc<AuthorizationPolicy>,
    ledger: Arc<AttendanceLedger>,
    reports: Arc<ReportAggregator>,
    audit: AuditRecorder,
}

impl AttendanceService {
    pub fn new(
        policy: Arc<AuthorizationPolicy>,
        ledger: Arc<AttendanceLedger>,
        reports: Arc<ReportAggregator>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            policy,
            ledger,
            reports,
            audit,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.ledger.today()
    }

    #[instrument(skip(self, caller, location), fields(caller_id = caller.id))]
    pub async fn clock_in(
        &self,
        caller: &Caller,
        location: Option<String>,
    ) -> AppResult<AttendanceRecord> {
        let location = location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        if location.as_ref().is_some_and(|l| l.chars().count() > MAX_LOCATION_LEN) {
            return Err(AppError::field("location", "must be at most 255 characters"));
        }

        self.policy
            .authorize(caller, Action::ClockIn, Target::User(caller.id))
            .await?;

        let record = self.ledger.clock_in(caller.id, location).await?;

        self.audit.record(
            Some(caller.id),
            AuditAction::ClockIn,
            attendance_path(caller.id, record.date),
        );
        info!(record_id = record.id, date = %record.date, "Clocked in");
        Ok(record)
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn clock_out(&self, caller: &Caller) -> AppResult<AttendanceRecord> {
        self.policy
            .authorize(caller, Action::ClockOut, Target::User(caller.id))
            .await?;

        let record = self.ledger.clock_out(caller.id).await?;

        self.audit.record(
            Some(caller.id),
            AuditAction::ClockOut,
            attendance_path(caller.id, record.date),
        );
        info!(record_id = record.id, date = %record.date, hours = ?record.hours_worked, "Clocked out");
        Ok(record)
    }

    /// Records for one user, one department, or (administrators only) everyone.
    /// Without filters a non-administrator gets their own records.
    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn list(
        &self,
        caller: &Caller,
        query: AttendanceQuery,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let records = match (query.user_id, query.department_id) {
            (Some(user_id), _) => {
                self.policy
                    .authorize(caller, Action::ReadRecords, Target::User(user_id))
                    .await?;
                self.ledger.list_by_user(user_id, query.range).await?
            }
            (None, Some(department_id)) => {
                self.policy
                    .authorize(caller, Action::ReadRecords, Target::Department(department_id))
                    .await?;
                self.ledger.list_all(query.range, Some(department_id)).await?
            }
            (None, None) => match caller.role {
                Role::Administrator => {
                    self.policy
                        .authorize(caller, Action::ReadRecords, Target::Organization)
                        .await?;
                    self.ledger.list_all(query.range, None).await?
                }
                Role::Supervisor | Role::Employee | Role::Guest => {
                    self.policy
                        .authorize(caller, Action::ReadRecords, Target::User(caller.id))
                        .await?;
                    self.ledger.list_by_user(caller.id, query.range).await?
                }
            },
        };
        Ok(records)
    }

    pub async fn get(
        &self,
        caller: &Caller,
        user_id: UserId,
        date: NaiveDate,
    ) -> AppResult<AttendanceRecord> {
        self.policy
            .authorize(caller, Action::ReadRecords, Target::User(user_id))
            .await?;
        self.ledger
            .get_by_user_and_date(user_id, date)
            .await?
            .ok_or_else(|| AppError::NotFound("attendance record".into()))
    }

    pub async fn summary(
        &self,
        caller: &Caller,
        range: DateRange,
        department_id: Option<DepartmentId>,
    ) -> AppResult<Summary> {
        self.reports.summarize(range, department_id, caller).await
    }

    pub async fn snapshot(&self, caller: &Caller, date: NaiveDate) -> AppResult<Snapshot> {
        self.policy
            .authorize(caller, Action::ViewSnapshot, Target::Organization)
            .await?;
        self.reports.organization_snapshot(date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use crate::testing::{Harness, at};

    #[tokio::test]
    async fn full_day_scenario() {
        let h = Harness::new().await;
        let e1 = Caller::from(&h.org.e1);

        h.clock.set(at(9, 0));
        h.state.attendance.clock_in(&e1, None).await.unwrap();
        h.clock.set(at(17, 30));
        let closed = h.state.attendance.clock_out(&e1).await.unwrap();
        assert_eq!(closed.status, AttendanceStatus::Closed);
        assert_eq!(closed.hours_worked, Some(8.5));

        let again = h.state.attendance.clock_in(&e1, None).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let date = h.state.attendance.today();
        let s1 = Caller::from(&h.org.s1);
        let seen = h.state.attendance.get(&s1, h.org.e1.id, date).await.unwrap();
        assert_eq!(seen.hours_worked, Some(8.5));

        let s2 = Caller::from(&h.org.s2);
        let denied = h.state.attendance.get(&s2, h.org.e1.id, date).await.unwrap_err();
        assert!(matches!(denied, AppError::AuthorizationDenied));
    }

    #[tokio::test]
    async fn successful_clock_in_is_audited_once() {
        let h = Harness::new().await;
        let e1 = Caller::from(&h.org.e1);
        h.state.attendance.clock_in(&e1, Some("HQ".into())).await.unwrap();
        h.audit.flush().await;

        let entries = h.audit_sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::ClockIn);
        assert_eq!(entries[0].actor_user_id, Some(h.org.e1.id));
        assert_eq!(entries[0].target, attendance_path(h.org.e1.id, h.state.attendance.today()));
    }

    #[tokio::test]
    async fn denied_and_failed_actions_leave_no_audit_entry() {
        let h = Harness::new().await;
        let guest = Caller::from(&h.org.guest);
        let denied = h.state.attendance.clock_in(&guest, None).await.unwrap_err();
        assert!(matches!(denied, AppError::AuthorizationDenied));

        let e1 = Caller::from(&h.org.e1);
        let failed = h.state.attendance.clock_out(&e1).await.unwrap_err();
        assert!(matches!(failed, AppError::InvalidState(_)));

        h.audit.flush().await;
        assert!(h.audit_sink.entries().is_empty());
    }

    #[tokio::test]
    async fn duplicate_clock_in_audits_only_the_first() {
        let h = Harness::new().await;
        let e1 = Caller::from(&h.org.e1);
        h.state.attendance.clock_in(&e1, None).await.unwrap();
        let _ = h.state.attendance.clock_in(&e1, None).await;
        h.audit.flush().await;
        assert_eq!(h.audit_sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn overlong_location_is_a_validation_error() {
        let h = Harness::new().await;
        let e1 = Caller::from(&h.org.e1);
        let err = h.state.attendance.clock_in(&e1, Some("x".repeat(256))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn listing_follows_visibility() {
        let h = Harness::new().await;
        let range = DateRange::single(h.state.attendance.today());
        for user in [&h.org.e1, &h.org.e2] {
            h.state.attendance.clock_in(&Caller::from(user), None).await.unwrap();
        }

        let admin = Caller::from(&h.org.admin);
        let all = h
            .state
            .attendance
            .list(&admin, AttendanceQuery { user_id: None, department_id: None, range })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let s1 = Caller::from(&h.org.s1);
        let d1 = h
            .state
            .attendance
            .list(&s1, AttendanceQuery { user_id: None, department_id: Some(h.org.d1.id), range })
            .await
            .unwrap();
        assert_eq!(d1.len(), 1);
        assert_eq!(d1[0].user_id, h.org.e1.id);

        let denied = h
            .state
            .attendance
            .list(&s1, AttendanceQuery { user_id: None, department_id: Some(h.org.d2.id), range })
            .await;
        assert!(matches!(denied, Err(AppError::AuthorizationDenied)));

        let e2 = Caller::from(&h.org.e2);
        let own = h
            .state
            .attendance
            .list(&e2, AttendanceQuery { user_id: None, department_id: None, range })
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].user_id, h.org.e2.id);

        let peek = h
            .state
            .attendance
            .list(&e2, AttendanceQuery { user_id: Some(h.org.e1.id), department_id: None, range })
            .await;
        assert!(matches!(peek, Err(AppError::AuthorizationDenied)));
    }

    #[tokio::test]
    async fn employees_cannot_view_the_snapshot() {
        let h = Harness::new().await;
        let today = h.state.attendance.today();
        let err = h
            .state
            .attendance
            .snapshot(&Caller::from(&h.org.e1), today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthorizationDenied));

        let snapshot = h.state.attendance.snapshot(&Caller::from(&h.org.guest), today).await.unwrap();
        assert_eq!(snapshot.total_users, 6);
    }

    #[tokio::test]
    async fn overnight_clock_out_is_audited_against_the_shift_date() {
        let h = Harness::new().await;
        let e1 = Caller::from(&h.org.e1);
        h.clock.set(at(22, 0));
        h.state.attendance.clock_in(&e1, None).await.unwrap();

        h.clock.set(at(22, 0) + chrono::Duration::hours(9));
        let closed = h.state.attendance.clock_out(&e1).await.unwrap();
        assert_eq!(closed.hours_worked, Some(9.0));

        h.audit.flush().await;
        let entries = h.audit_sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].target, attendance_path(h.org.e1.id, at(0, 0).date_naive()));
    }
}
