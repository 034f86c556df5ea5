pub mod admin;
pub mod attendance;

pub use admin::AdminService;
pub use attendance::{AttendanceQuery, AttendanceService};
