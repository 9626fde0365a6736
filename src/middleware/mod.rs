pub mod credentials;

pub use credentials::{credentials_middleware, AuthUser};
