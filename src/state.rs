use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::clock::Clock;
use crate::ledger::AttendanceLedger;
use crate::policy::AuthorizationPolicy;
use crate::report::ReportAggregator;
use crate::service::{AdminService, AttendanceService};
use crate::store::{AttendanceStore, AuditSink, IdentityStore};

/// One instance per process, built once in `main` and shared with handlers.
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub attendance: AttendanceService,
    pub admin: AdminService,
    pub audit: AuditRecorder,
}

impl AppState {
    /// Wires the components together. Spawns the audit writer, so it must
    /// run inside a tokio runtime.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        records: Arc<dyn AttendanceStore>,
        audit_sink: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        audit_queue_capacity: usize,
    ) -> Self {
        let policy = Arc::new(AuthorizationPolicy::new(identities.clone()));
        let ledger = Arc::new(AttendanceLedger::new(records, identities.clone(), clock.clone()));
        let reports = Arc::new(ReportAggregator::new(identities.clone(), ledger.clone()));
        let audit = AuditRecorder::spawn(audit_sink, clock, audit_queue_capacity);

        Self {
            attendance: AttendanceService::new(policy.clone(), ledger, reports, audit.clone()),
            admin: AdminService::new(identities.clone(), policy, audit.clone()),
            identities,
            audit,
        }
    }
}
