//! Login, registration and logout.

use thiserror::Error;

use crate::client::{Access, ApiClient};
use crate::error::{ApiError, StoreError};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration input rejected before contacting the backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
}

/// Check registration input the way the login form does.
pub fn validate_registration(
    username: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), RegistrationError> {
    if username.trim().is_empty() {
        return Err(RegistrationError::EmptyUsername);
    }
    if password != confirmation {
        return Err(RegistrationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RegistrationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

/// Authentication operations.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /login`. On success the token and profile are stored in the session.
    ///
    /// A 401 means bad credentials and leaves the session untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = self.client.post("login", &request, Access::Public).await?;
        self.client.session().establish(&response)?;
        Ok(response)
    }

    /// `POST /usuarios`. A 400 means the username is taken.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let response: RegisterResponse = self.client.post("usuarios", request, Access::Public).await?;
        tracing::info!(username = %response.username, "User registered");
        Ok(response)
    }

    /// Clear local credentials. Returns whether a session was active.
    pub fn logout(&self) -> Result<bool, StoreError> {
        self.client.session().logout()
    }
}
