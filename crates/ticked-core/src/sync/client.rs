//! Sync client implementation
//!
//! HTTP client for the backend's push and pull endpoints. Every request
//! carries the bearer token the client was created with; swapping
//! credentials means creating a new client (and a new store binding).

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::storage::StorageError;
use crate::store::SharedReplica;

use super::message::{PullRequest, PullResponse, PushRequest, PULL_VERSION, PUSH_VERSION};

/// Reconciliation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No reconciliation running
    Disconnected,
    /// A push/pull round is in flight
    Syncing,
    /// Last round completed
    Connected,
    /// Last round failed
    Error,
}

/// Errors from a push/pull round
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request never completed
    #[error("Sync request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Sync endpoint rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The pull response body did not decode
    #[error("Could not decode pull response: {0}")]
    Decode(String),

    /// The replica could not be persisted after a pull
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// HTTP sync client bound to one token
pub struct SyncClient {
    http: reqwest::Client,
    push_url: String,
    pull_url: String,
    auth: String,
}

impl SyncClient {
    /// Create a sync client for the configured endpoints
    pub fn new(config: &Config, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            push_url: config.push_url(),
            pull_url: config.pull_url(),
            auth: format!("Bearer {token}"),
        }
    }

    /// Upload the pending mutation batch
    ///
    /// Mutations stay queued until a pull confirms them; a push is only
    /// the replay request. Returns the number of mutations sent (zero
    /// skips the request entirely).
    pub async fn push_once(&self, shared: &SharedReplica) -> Result<usize, SyncError> {
        let (client_id, mutations) = {
            let replica = shared.lock();
            (replica.client_id().to_string(), replica.pending().to_vec())
        };

        if mutations.is_empty() {
            return Ok(0);
        }

        debug!(count = mutations.len(), "pushing mutations");
        let response = self
            .http
            .post(&self.push_url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(&PushRequest {
                client_id: &client_id,
                mutations: &mutations,
                push_version: PUSH_VERSION,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                message: snippet(&message),
            });
        }

        Ok(mutations.len())
    }

    /// Download and apply the server patch
    ///
    /// Returns true if the optimistic state changed (callers refresh
    /// their views on true).
    pub async fn pull_once(&self, shared: &SharedReplica) -> Result<bool, SyncError> {
        let (client_id, cookie) = {
            let replica = shared.lock();
            (replica.client_id().to_string(), replica.cookie().cloned())
        };

        debug!("pulling");
        let response = self
            .http
            .post(&self.pull_url)
            .header(reqwest::header::AUTHORIZATION, &self.auth)
            .json(&PullRequest {
                client_id: &client_id,
                cookie: cookie.as_ref(),
                pull_version: PULL_VERSION,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                message: snippet(&message),
            });
        }

        let body = response.text().await?;
        let pull: PullResponse =
            serde_json::from_str(&body).map_err(|e| SyncError::Decode(e.to_string()))?;

        let changed = {
            let mut replica = shared.lock();
            let changed = replica.apply_pull(&pull);
            shared.persist(&replica)?;
            changed
        };

        if changed {
            info!("applied remote changes");
            shared.mark_changed();
        }
        Ok(changed)
    }

    /// One full reconciliation round: push, then pull
    pub async fn sync_once(&self, shared: &SharedReplica) -> Result<bool, SyncError> {
        let pushed = self.push_once(shared).await?;
        if pushed > 0 {
            debug!(pushed, "push complete");
        }
        self.pull_once(shared).await
    }
}

/// First line of a response body, bounded, for error messages
fn snippet(body: &str) -> String {
    body.lines().next().unwrap_or("").chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_client_new() {
        let mut config = Config::default();
        config.api_url = "https://api.example.com".to_string();

        // Construction binds the endpoints and token eagerly
        let client = SyncClient::new(&config, "tok-123");
        assert_eq!(client.push_url, "https://api.example.com/api/replicache/push");
        assert_eq!(client.pull_url, "https://api.example.com/api/replicache/pull");
        assert_eq!(client.auth, "Bearer tok-123");
    }

    #[test]
    fn test_sync_status() {
        assert_eq!(SyncStatus::Disconnected, SyncStatus::Disconnected);
        assert_ne!(SyncStatus::Connected, SyncStatus::Syncing);
    }

    #[test]
    fn test_snippet_bounds_error_bodies() {
        assert_eq!(snippet("line one\nline two"), "line one");
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), 120);
    }
}
