//! Credential store: the bearer token and the display profile.

use std::sync::Arc;

use crate::error::StoreError;
use crate::models::UserProfile;
use crate::storage::Storage;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "rfid_token";

/// Storage key of the JSON-encoded user profile.
pub const USER_KEY: &str = "rfid_user";

/// Token and profile persistence over a [`Storage`] backend.
///
/// At most one token is stored at a time; its presence is the only signal
/// of an authenticated session.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Store the token, overwriting any prior value.
    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.storage.set(TOKEN_KEY, token)
    }

    pub fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    /// Remove token and profile together.
    pub fn remove_token(&self) -> Result<(), StoreError> {
        self.storage.remove(&[TOKEN_KEY, USER_KEY])
    }

    pub fn set_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(profile)?;
        self.storage.set(USER_KEY, &encoded)
    }

    /// Store token and profile in one write, so neither is seen without the other.
    pub fn set_credentials(&self, token: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(profile)?;
        self.storage
            .set_many(&[(TOKEN_KEY, token), (USER_KEY, encoded.as_str())])
    }

    /// Stored profile; a malformed entry reads as no profile.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed stored user profile");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}
