pub mod attendance_service;
pub mod health_unit_service;
pub mod user_service;

pub use attendance_service::AttendanceService;
pub use health_unit_service::HealthUnitService;
pub use user_service::{LoginSuccess, UserService};
