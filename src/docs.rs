use crate::api::admin::{AssignDepartment, SetManager};
use crate::api::attendance::ClockInRequest;
use crate::model::{
    FieldError,
    attendance::{AttendanceRecord, AttendanceStatus, DateRange},
    department::{Department, NewDepartment},
    role::Role,
    user::{NewUser, Profile, User},
};
use crate::report::{Snapshot, Summary, UserSummary};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking

Daily clock-in/clock-out for the members of an organization, with
role and department based access.

### Key Features
- **Attendance**
  - One record per user and day; clock in, clock out, browse history
- **Reports**
  - Per-user summaries over a date range and a daily organization snapshot
- **Administration**
  - Create and deactivate users, manage departments and their managers

### Roles
- **Administrator**: everything
- **Supervisor**: own records, plus read access to departments they manage
- **Employee**: own records only
- **Guest**: own (empty) records and the organization snapshot. Never clocks in or out

### Security
Every endpoint requires a **JWT Bearer** access token. Role, department and
active flag are read fresh on each request.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::get_record,

        crate::api::report::summary,
        crate::api::report::snapshot,

        crate::api::admin::create_user,
        crate::api::admin::assign_department,
        crate::api::admin::deactivate_user,
        crate::api::admin::create_department,
        crate::api::admin::set_department_manager,
        crate::api::admin::deactivate_department
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            DateRange,
            ClockInRequest,
            Summary,
            UserSummary,
            Snapshot,
            User,
            Profile,
            NewUser,
            Role,
            Department,
            NewDepartment,
            AssignDepartment,
            SetManager,
            FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock-in, clock-out and attendance history"),
        (name = "Reports", description = "Attendance summaries and snapshots"),
        (name = "Admin", description = "User and department administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/attendance/clock-in",
            "/api/attendance",
            "/api/reports/summary",
            "/api/admin/departments/{id}/manager",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
