//! Session context shared by the API client, the services and the shell.
//!
//! The session owns the credential store and publishes lifecycle events.
//! Transport code calls [`Session::expire`] on unauthorized responses; the
//! application shell subscribes and decides how to send the user back to
//! the login flow.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::credentials::CredentialStore;
use crate::error::StoreError;
use crate::models::{LoginResponse, UserProfile};
use crate::storage::Storage;

const EVENT_CAPACITY: usize = 16;

/// Authentication state, derived from token presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were stored after a successful login.
    LoggedIn { username: String },
    /// The user logged out explicitly.
    LoggedOut,
    /// The backend rejected the stored token.
    Expired,
}

/// Explicit session context.
pub struct Session {
    credentials: CredentialStore,
    events: broadcast::Sender<SessionEvent>,
    /// Serializes state transitions so concurrent expiries clear once.
    transition: Mutex<()>,
}

impl Session {
    pub fn new(credentials: CredentialStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            credentials,
            events,
            transition: Mutex::new(()),
        })
    }

    /// Session over an arbitrary storage backend.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Arc<Self> {
        Self::new(CredentialStore::new(storage))
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn state(&self) -> SessionState {
        if self.credentials.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn token(&self) -> Option<String> {
        self.credentials.token()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.credentials.user()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Anonymous -> Authenticated: persist token and profile.
    pub fn establish(&self, login: &LoginResponse) -> Result<(), StoreError> {
        let _guard = self.transition.lock().unwrap_or_else(|e| e.into_inner());
        self.credentials
            .set_credentials(&login.access_token, &login.profile())?;

        tracing::info!(username = %login.username, "Session established");
        self.emit(SessionEvent::LoggedIn {
            username: login.username.clone(),
        });
        Ok(())
    }

    /// Explicit logout. Returns whether a session was active.
    pub fn logout(&self) -> Result<bool, StoreError> {
        let cleared = self.clear()?;
        if cleared {
            tracing::info!("Logged out");
            self.emit(SessionEvent::LoggedOut);
        }
        Ok(cleared)
    }

    /// The backend rejected our token: clear credentials and announce it.
    ///
    /// Only the call that performs the Authenticated -> Anonymous transition
    /// emits [`SessionEvent::Expired`]; later calls are no-ops.
    pub fn expire(&self) -> Result<bool, StoreError> {
        let cleared = self.clear()?;
        if cleared {
            tracing::warn!("Session expired, credentials cleared");
            self.emit(SessionEvent::Expired);
        }
        Ok(cleared)
    }

    fn clear(&self) -> Result<bool, StoreError> {
        let _guard = self.transition.lock().unwrap_or_else(|e| e.into_inner());
        let was_authenticated = self.credentials.is_authenticated();
        self.credentials.remove_token()?;
        Ok(was_authenticated)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the shell may not be listening yet.
        let _ = self.events.send(event);
    }
}
