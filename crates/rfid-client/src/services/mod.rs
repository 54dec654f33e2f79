//! Typed operations over the API client.

pub mod auth;
pub mod dashboard;

pub use auth::{validate_registration, AuthService, RegistrationError, MIN_PASSWORD_LEN};
pub use dashboard::DashboardService;
