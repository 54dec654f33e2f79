//! HTTP transport to the RFID backend.

mod api;

pub use api::{Access, ApiClient};
