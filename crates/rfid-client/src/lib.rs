//! RFID livestock monitoring client
//!
//! Authenticated access to the RFID backend API.
//!
//! This crate provides:
//! - Credential store for the bearer token and user profile
//! - Session context with lifecycle events (login, logout, expiry)
//! - HTTP client that attaches the token and expires the session on 401
//! - Auth and dashboard services with typed request/response models
//! - Periodic stats poller with out-of-order response protection

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod poller;
pub mod services;
pub mod session;
pub mod storage;

pub use client::{Access, ApiClient};
pub use config::ClientConfig;
pub use credentials::CredentialStore;
pub use error::{ApiError, StoreError};
pub use poller::{PollUpdate, StatsPoller};
pub use services::{AuthService, DashboardService};
pub use session::{Session, SessionEvent, SessionState};
pub use storage::{FileStorage, MemoryStorage, Storage};
