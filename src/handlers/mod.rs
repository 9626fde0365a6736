pub mod attendances;
pub mod health_units;
pub mod system;
pub mod users;
