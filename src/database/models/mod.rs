pub mod attendance;
pub mod health_unit;
pub mod user;
