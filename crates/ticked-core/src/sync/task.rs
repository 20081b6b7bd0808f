//! Background reconciliation task
//!
//! Runs push/pull rounds on an interval, retries failures with
//! exponential backoff, and reports progress over channels. Views nudge
//! the task after local writes with [`SyncCommand::PushNow`] and shut it
//! down when the store unbinds.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::config::Config;
use crate::store::SharedReplica;

use super::client::{SyncClient, SyncStatus};

/// Commands sent to the sync task
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Run a reconciliation round now (after a local write)
    PushNow,
    /// Shutdown the sync task
    Shutdown,
}

/// Events emitted by the sync task
#[derive(Debug, Clone)]
pub enum SyncTaskEvent {
    /// Reconciliation status changed
    StatusChanged(SyncStatus),
    /// The replica was updated from remote changes
    Updated,
    /// Error occurred
    Error(String),
}

/// Handle to control the sync task
pub struct SyncHandle {
    /// Send commands to the sync task
    pub command_tx: mpsc::Sender<SyncCommand>,
    /// Receive events from the sync task
    pub event_rx: mpsc::Receiver<SyncTaskEvent>,
    /// Watch reconciliation status
    pub status_rx: watch::Receiver<SyncStatus>,
}

/// Configuration for the sync task
#[derive(Debug, Clone)]
pub struct SyncTaskConfig {
    /// Cadence of reconciliation rounds
    pub poll_interval: Duration,
    /// Initial retry delay after a failed round
    pub initial_backoff: Duration,
    /// Maximum retry delay
    pub max_backoff: Duration,
}

impl Default for SyncTaskConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl SyncTaskConfig {
    /// Derive the task cadence from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.sync_interval_secs.max(1)),
            ..Self::default()
        }
    }
}

/// Spawn the background sync task
///
/// Returns a handle to control and monitor the task. The task runs one
/// round immediately, then polls on the configured interval until it is
/// shut down.
pub fn spawn_sync_task(
    client: SyncClient,
    shared: SharedReplica,
    config: SyncTaskConfig,
) -> SyncHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(SyncStatus::Disconnected);

    tokio::spawn(sync_task_loop(
        client, shared, config, command_rx, event_tx, status_tx,
    ));

    SyncHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

/// Main task loop: sync round, then wait for the next trigger
async fn sync_task_loop(
    client: SyncClient,
    shared: SharedReplica,
    config: SyncTaskConfig,
    mut command_rx: mpsc::Receiver<SyncCommand>,
    event_tx: mpsc::Sender<SyncTaskEvent>,
    status_tx: watch::Sender<SyncStatus>,
) {
    let mut backoff = config.initial_backoff;

    loop {
        set_status(&status_tx, &event_tx, SyncStatus::Syncing).await;

        let wait = match client.sync_once(&shared).await {
            Ok(changed) => {
                backoff = config.initial_backoff;
                set_status(&status_tx, &event_tx, SyncStatus::Connected).await;
                if changed {
                    let _ = event_tx.send(SyncTaskEvent::Updated).await;
                }
                config.poll_interval
            }
            Err(e) => {
                warn!("sync round failed: {e}");
                set_status(&status_tx, &event_tx, SyncStatus::Error).await;
                let _ = event_tx.send(SyncTaskEvent::Error(e.to_string())).await;
                let wait = backoff;
                backoff = (backoff * 2).min(config.max_backoff);
                wait
            }
        };

        // Wait for the next round, but stay responsive to commands
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            cmd = command_rx.recv() => {
                match cmd {
                    Some(SyncCommand::PushNow) => {
                        // Loop around and sync immediately
                    }
                    Some(SyncCommand::Shutdown) | None => {
                        set_status(&status_tx, &event_tx, SyncStatus::Disconnected).await;
                        break;
                    }
                }
            }
        }
    }
}

async fn set_status(
    status_tx: &watch::Sender<SyncStatus>,
    event_tx: &mpsc::Sender<SyncTaskEvent>,
    status: SyncStatus,
) {
    let _ = status_tx.send(status);
    let _ = event_tx.send(SyncTaskEvent::StatusChanged(status)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncTaskConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_app_config() {
        let mut app_config = Config::default();
        app_config.sync_interval_secs = 5;
        let config = SyncTaskConfig::from_config(&app_config);
        assert_eq!(config.poll_interval, Duration::from_secs(5));

        // A zero interval is clamped rather than spinning
        app_config.sync_interval_secs = 0;
        let config = SyncTaskConfig::from_config(&app_config);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_sync_command() {
        let cmd = SyncCommand::PushNow;
        match cmd {
            SyncCommand::PushNow => {}
            SyncCommand::Shutdown => panic!("Wrong variant"),
        }
    }
}
