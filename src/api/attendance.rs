use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::api::parse_id_field;
use crate::error::{AppError, AppResult};
use crate::model::{
    UserId,
    attendance::{AttendanceRecord, DateRange},
};
use crate::policy::Caller;
use crate::service::AttendanceQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClockInRequest {
    #[schema(example = "Head office", nullable = true)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilter {
    /// Records of one user.
    #[param(value_type = Option<u64>)]
    pub user_id: Option<String>,
    /// Records of every member of one department.
    #[param(value_type = Option<u64>)]
    pub department_id: Option<String>,
    /// First day, `YYYY-MM-DD`. Defaults to today.
    pub from: Option<String>,
    /// Last day, `YYYY-MM-DD`. Defaults to today.
    pub to: Option<String>,
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body(
        content = ClockInRequest,
        description = "Optional. An empty body clocks in without a location",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Clocked in", body = AttendanceRecord),
        (status = 400, description = "Malformed body or invalid location", body = Object, example = json!({
            "message": "validation failed",
            "errors": [{ "field": "location", "message": "must be at most 255 characters" }]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already clocked in today", body = Object, example = json!({
            "message": "already clocked in today"
        })),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    caller: Caller,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let location = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<ClockInRequest>(&body)
            .map_err(|e| AppError::field("body", e.to_string()))?
            .location
    };
    let record = state.attendance.clock_in(&caller, location).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Clock-out endpoint
///
/// Closes today's open record. When there is no record today, an open record
/// from the previous day is closed instead, so a shift running past midnight
/// (UTC) can still be ended.
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out", body = AttendanceRecord),
        (status = 400, description = "No open record to close", body = Object, example = json!({
            "message": "no open attendance record for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already clocked out today"),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(caller: Caller, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let record = state.attendance.clock_out(&caller).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Records ordered by date", body = [AttendanceRecord]),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<AttendanceFilter>,
) -> AppResult<HttpResponse> {
    let filter = query.into_inner();
    let mut errors = Vec::new();
    let user_id = parse_id_field("user_id", filter.user_id.as_deref(), &mut errors);
    let department_id =
        parse_id_field("department_id", filter.department_id.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let range = DateRange::parse(
        filter.from.as_deref(),
        filter.to.as_deref(),
        state.attendance.today(),
    )
    .map_err(AppError::Validation)?;

    let records = state
        .attendance
        .list(
            &caller,
            AttendanceQuery {
                user_id,
                department_id,
                range,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Get one user's record for one day
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}/{date}",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("date" = String, Path, description = "Day, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Record found", body = AttendanceRecord),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No record for that day")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<(UserId, String)>,
) -> AppResult<HttpResponse> {
    let (user_id, raw_date) = path.into_inner();
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| AppError::field("date", "must be a date formatted YYYY-MM-DD"))?;

    let record = state.attendance.get(&caller, user_id, date).await?;
    Ok(HttpResponse::Ok().json(record))
}
