//! Attendance state machine.
//!
//! Per (user, date) a record moves `NotStarted -> Open -> Closed` and never
//! back. Timestamps always come from the ledger's own clock.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::model::{
    DepartmentId, UserId,
    attendance::{AttendanceRecord, DateRange, NewAttendance},
};
use crate::store::{AttendanceStore, IdentityStore, StoreError};

pub const MAX_LOCATION_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

pub struct AttendanceLedger {
    records: Arc<dyn AttendanceStore>,
    identities: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
}

impl AttendanceLedger {
    pub fn new(
        records: Arc<dyn AttendanceStore>,
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            identities,
            clock,
        }
    }

    /// Current calendar date according to the ledger clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Opens today's record for `user_id`. The record date is taken from the
    /// clock-in timestamp. A second clock-in on the same day is a conflict,
    /// whatever the state of the first record.
    #[instrument(skip(self, location))]
    pub async fn clock_in(
        &self,
        user_id: UserId,
        location: Option<String>,
    ) -> LedgerResult<AttendanceRecord> {
        let now = self.clock.now();
        let new = NewAttendance {
            user_id,
            date: now.date_naive(),
            clock_in: now,
            location,
        };

        match self.records.insert_if_absent(new).await? {
            Some(record) => {
                debug!(record_id = record.id, "Clocked in");
                Ok(record)
            }
            None => Err(LedgerError::Conflict("already clocked in today".into())),
        }
    }

    /// Closes the open record for `user_id`: today's, or yesterday's when
    /// there is none today (a shift running past midnight).
    #[instrument(skip(self))]
    pub async fn clock_out(&self, user_id: UserId) -> LedgerResult<AttendanceRecord> {
        let now = self.clock.now();
        let today = now.date_naive();

        if let Some(record) = self.records.close_if_open(user_id, today, now).await? {
            debug!(record_id = record.id, hours = ?record.hours_worked, "Clocked out");
            return Ok(record);
        }

        // The conditional update matched nothing; report why.
        match self.records.find(user_id, today).await? {
            Some(record) if !record.is_open() => {
                Err(LedgerError::Conflict("already clocked out today".into()))
            }
            Some(_) => Err(LedgerError::InvalidState(
                "clock-out must be later than clock-in".into(),
            )),
            None => {
                let overnight = match today.pred_opt() {
                    Some(yesterday) => self.records.close_if_open(user_id, yesterday, now).await?,
                    None => None,
                };
                match overnight {
                    Some(record) => {
                        debug!(record_id = record.id, hours = ?record.hours_worked, "Clocked out overnight shift");
                        Ok(record)
                    }
                    None => Err(LedgerError::InvalidState(
                        "no open attendance record for today".into(),
                    )),
                }
            }
        }
    }

    pub async fn get_by_user_and_date(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> LedgerResult<Option<AttendanceRecord>> {
        Ok(self.records.find(user_id, date).await?)
    }

    pub async fn list_by_user(
        &self,
        user_id: UserId,
        range: DateRange,
    ) -> LedgerResult<Vec<AttendanceRecord>> {
        Ok(self.records.list(Some(std::slice::from_ref(&user_id)), range).await?)
    }

    /// Every record in `range`, optionally limited to members of `department`.
    pub async fn list_all(
        &self,
        range: DateRange,
        department: Option<DepartmentId>,
    ) -> LedgerResult<Vec<AttendanceRecord>> {
        match department {
            None => Ok(self.records.list(None, range).await?),
            Some(department_id) => {
                let members: Vec<UserId> = self
                    .identities
                    .list_users(Some(department_id))
                    .await?
                    .into_iter()
                    .map(|u| u.id)
                    .collect();
                Ok(self.records.list(Some(&members), range).await?)
            }
        }
    }

    /// Records for an explicit set of users, used by the report aggregator.
    pub async fn list_for_users(
        &self,
        users: &[UserId],
        range: DateRange,
    ) -> LedgerResult<Vec<AttendanceRecord>> {
        Ok(self.records.list(Some(users), range).await?)
    }
}
