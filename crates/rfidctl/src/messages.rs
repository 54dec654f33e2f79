//! User-facing wording for API failures.
//!
//! The client forwards backend statuses untouched; what a status means
//! depends on which screen issued the call.

use rfid_client::ApiError;

pub const SESSION_EXPIRED: &str = "Session expired. Log in again with `rfidctl login`.";
pub const NOT_LOGGED_IN: &str = "Not logged in. Run `rfidctl login` first.";

const UNREACHABLE: &str = "Could not reach the server. Check that the backend is running.";

/// Which flow an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Login,
    Register,
    /// Any call made with the session token.
    Session,
    /// Public health check.
    Status,
}

pub fn describe(flow: Flow, err: &ApiError) -> String {
    match flow {
        Flow::Login if err.is_unauthorized() => "Invalid username or password.".to_string(),
        Flow::Register if err.is_bad_request() => "Username already exists.".to_string(),
        Flow::Register if !err.is_connectivity() => {
            format!("Could not create user. Try again.{}", detail_suffix(err))
        }
        Flow::Session if err.is_unauthorized() => SESSION_EXPIRED.to_string(),
        _ if err.is_connectivity() => UNREACHABLE.to_string(),
        _ => format!("Request failed: {}", backend_detail(err).unwrap_or_else(|| err.to_string())),
    }
}

/// The `detail` field of an error body, when the backend sent one.
fn backend_detail(err: &ApiError) -> Option<String> {
    let ApiError::Http { body, .. } = err else {
        return None;
    };
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn detail_suffix(err: &ApiError) -> String {
    backend_detail(err)
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}
