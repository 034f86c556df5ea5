use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::parse_id_field;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{DateRange, parse_date_field};
use crate::policy::Caller;
use crate::report::{Snapshot, Summary};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// First day, `YYYY-MM-DD`. Defaults to today.
    pub from: Option<String>,
    /// Last day, `YYYY-MM-DD`. Defaults to today.
    pub to: Option<String>,
    #[param(value_type = Option<u64>)]
    pub department_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnapshotQuery {
    /// Day to count, `YYYY-MM-DD`. Defaults to today.
    pub date: Option<String>,
}

/// Per-user attendance summary
///
/// Only users the caller may read are included.
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary over the range", body = Summary),
        (status = 400, description = "Invalid date range", body = Object, example = json!({
            "message": "validation failed",
            "errors": [{ "field": "from", "message": "must not be after 'to'" }]
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn summary(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> AppResult<HttpResponse> {
    let mut errors = Vec::new();
    let department_id =
        parse_id_field("department_id", query.department_id.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let range = DateRange::parse(
        query.from.as_deref(),
        query.to.as_deref(),
        state.attendance.today(),
    )
    .map_err(AppError::Validation)?;

    let summary = state
        .attendance
        .summary(&caller, range, department_id)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Organization-wide counts for one day
#[utoipa::path(
    get,
    path = "/api/reports/snapshot",
    params(SnapshotQuery),
    responses(
        (status = 200, description = "Counts of not started, open and closed users", body = Snapshot),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn snapshot(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<SnapshotQuery>,
) -> AppResult<HttpResponse> {
    let mut errors = Vec::new();
    let date = parse_date_field(
        "date",
        query.date.as_deref(),
        state.attendance.today(),
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let snapshot = state.attendance.snapshot(&caller, date).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}
