pub mod attendance_repository;
pub mod health_unit_repository;
pub mod manager;
pub mod models;
pub mod user_repository;
