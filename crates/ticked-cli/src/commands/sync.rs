//! Sync command handler

use anyhow::Result;

use ticked_core::sync::SyncClient;
use ticked_core::Store;

use crate::output::Output;

/// Run one reconciliation round against the backend
pub async fn sync(store: &Store, output: &Output) -> Result<()> {
    let client = SyncClient::new(store.config(), store.auth_token());

    output.message("Reconciling with the backend...");

    match client.sync_once(&store.shared()).await {
        Ok(changed) => {
            if changed {
                output.success("Sync complete - applied remote changes");
            } else {
                output.success("Sync complete - already up to date");
            }
            output.message(&format!(
                "  Todos: {}, pending mutations: {}",
                store.todo_count(),
                store.pending_count()
            ));
            Ok(())
        }
        Err(e) => {
            output.message(&format!("Sync failed: {}", e));
            Err(e.into())
        }
    }
}
