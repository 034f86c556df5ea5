use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::{FieldError, RecordId, UserId};

/// Longest range accepted by list and report queries.
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "user_id": 7,
    "date": "2025-03-10",
    "clock_in": "2025-03-10T09:00:00Z",
    "clock_out": "2025-03-10T17:30:00Z",
    "status": "closed",
    "hours_worked": 8.5,
    "location": null
}))]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: UserId,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    /// Set once, when the record closes.
    pub hours_worked: Option<f64>,
    /// Opaque, never interpreted.
    pub location: Option<String>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.status == AttendanceStatus::Open
    }
}

/// Values for the insert performed by a clock-in.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub clock_in: DateTime<Utc>,
    pub location: Option<String>,
}

/// Worked time in hours, rounded to two decimals and never negative.
pub fn hours_between(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> f64 {
    let seconds = (clock_out - clock_in).num_seconds().max(0) as f64;
    round2(seconds / 3600.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Inclusive calendar interval `[start, end]`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, Vec<FieldError>> {
        if start > end {
            return Err(vec![FieldError::new("from", "must not be after 'to'")]);
        }
        if (end - start).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(vec![FieldError::new(
                "to",
                "range must not exceed 366 days",
            )]);
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Parses `from`/`to` query values, defaulting a missing bound to `today`.
    pub fn parse(
        from: Option<&str>,
        to: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        let start = parse_date_field("from", from, today, &mut errors);
        let end = parse_date_field("to", to, today, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the range.
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }
}

pub fn parse_date_field(
    field: &'static str,
    value: Option<&str>,
    default: NaiveDate,
    errors: &mut Vec<FieldError>,
) -> NaiveDate {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_else(|_| {
            errors.push(FieldError::new(field, "must be a date formatted YYYY-MM-DD"));
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn hours_are_rounded_to_two_decimals() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 17, 30, 0).unwrap();
        assert_eq!(hours_between(start, end), 8.5);

        let odd = Utc.with_ymd_and_hms(2025, 3, 10, 9, 20, 0).unwrap();
        assert_eq!(hours_between(start, odd), 0.33);
    }

    #[test]
    fn hours_never_negative() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(hours_between(start, before), 0.0);
    }

    #[test]
    fn range_counts_inclusive_days() {
        let range = DateRange::new(d(2025, 3, 1), d(2025, 3, 10)).unwrap();
        assert_eq!(range.days(), 10);
        assert!(range.contains(d(2025, 3, 10)));
        assert!(!range.contains(d(2025, 3, 11)));
    }

    #[test]
    fn parse_reports_per_field_errors() {
        let errors = DateRange::parse(Some("03/01/2025"), Some("nope"), d(2025, 3, 1)).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["from", "to"]);
    }

    #[test]
    fn parse_defaults_missing_bounds_to_today() {
        let today = d(2025, 3, 10);
        let range = DateRange::parse(Some("2025-03-01"), None, today).unwrap();
        assert_eq!(range, DateRange::new(d(2025, 3, 1), today).unwrap());
    }

    #[test]
    fn rejects_inverted_and_oversized_ranges() {
        assert!(DateRange::new(d(2025, 3, 2), d(2025, 3, 1)).is_err());
        assert!(DateRange::new(d(2024, 1, 1), d(2025, 1, 1)).is_err());
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 12, 31)).is_ok());
    }
}
