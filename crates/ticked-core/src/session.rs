//! Session handling
//!
//! `SessionStore` keeps the bearer token durable across restarts as a
//! single file in the data directory. `Session` is the in-memory signed-in
//! state, passed explicitly to the views that need it.
//!
//! The stored token alone gates access to the protected views: presence
//! is the only client-side check, validity is enforced by the backend on
//! the first authenticated request.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::config::Config;
use crate::storage::persistence::atomic_write;
use crate::storage::{StorageError, StorageResult};

/// Durable storage for the session token
pub struct SessionStore {
    token_path: PathBuf,
}

impl SessionStore {
    /// Create a session store rooted in the configured data directory
    pub fn new(config: &Config) -> Self {
        Self {
            token_path: config.token_path(),
        }
    }

    /// The stored token, if a usable one is present
    ///
    /// Returns `None` for a missing file, an empty value, or the literal
    /// string "undefined" (an artifact older clients wrote when the
    /// backend response carried no token).
    pub fn token(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.token_path).ok()?;
        let token = raw.trim();
        if token.is_empty() || token == "undefined" {
            return None;
        }
        Some(token.to_string())
    }

    /// Persist a token, replacing any existing one
    pub fn store_token(&self, token: &str) -> StorageResult<()> {
        atomic_write(&self.token_path, token.as_bytes())
    }

    /// Remove the stored token
    pub fn clear_token(&self) -> StorageResult<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .map_err(|e| StorageError::from_io(e, self.token_path.clone()))?;
        }
        Ok(())
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_name: String,
    pub token: String,
}

/// In-memory session state
///
/// Reset on process start; the user descriptor is only populated through
/// an explicit sign-in, never rehydrated from the stored token.
#[derive(Debug, Default)]
pub struct Session {
    user: Option<User>,
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful sign-in
    pub fn login(&mut self, user_name: &str, token: &str) {
        debug!(user = user_name, "session established");
        self.user = Some(User {
            user_name: user_name.to_string(),
            token: token.to_string(),
        });
        self.token = Some(token.to_string());
    }

    /// End the session
    ///
    /// Clears the user, the in-memory token, and the stored token.
    pub fn logout(&mut self, store: &SessionStore) -> StorageResult<()> {
        debug!("session cleared");
        self.user = None;
        self.token = None;
        store.clear_token()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
