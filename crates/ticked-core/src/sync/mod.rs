//! Sync with the remote backend
//!
//! Reconciles the local replica with the backend over HTTP:
//!
//! 1. Push the pending mutation batch (the server replays it)
//! 2. Pull a patch against the last cookie and apply it
//! 3. Re-apply still-unconfirmed mutations on top
//!
//! Local writes never wait for this; reconciliation runs in a background
//! task that polls on an interval and can be nudged after a write.
//!
//! ## Usage
//!
//! ```ignore
//! let client = SyncClient::new(store.config(), token);
//! let handle = spawn_sync_task(client, store.shared(), SyncTaskConfig::default());
//! handle.command_tx.send(SyncCommand::PushNow).await?;
//! ```

pub mod client;
pub mod message;
pub mod task;

pub use client::{SyncClient, SyncError, SyncStatus};
pub use message::{MutationRecord, PatchOp, PullResponse};
pub use task::{spawn_sync_task, SyncCommand, SyncHandle, SyncTaskConfig, SyncTaskEvent};
