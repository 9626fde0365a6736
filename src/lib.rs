pub mod auth;
pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod services;
