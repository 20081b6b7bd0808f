//! Unified storage interface
//!
//! The `Store` binds one named replica to one session token and
//! coordinates between:
//! - the in-memory replica (optimistic working copy)
//! - the replica file on disk (rewritten after every mutation)
//! - subscribers (a change counter bumped on every visible change)
//!
//! ## Binding
//!
//! A store is opened per view mount with the token captured at that
//! moment. Swapping credentials means dropping the store and opening a
//! new one; there is no rebinding of a live instance.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open(config, "todo-user", &token)?;
//!
//! let id = models::new_todo_id();
//! store.create_todo(&id, "Buy milk", store.next_order())?;
//!
//! let todos = store.todos(); // sorted by order
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::config::Config;
use crate::models::Todo;
use crate::replica::{MutationError, Replica};
use crate::storage::{ReplicaPersistence, StorageError};

/// Errors from store mutations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The mutation itself failed (namespace unchanged)
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// The mutation applied but the replica file could not be written
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Replica state shared between the store and the sync task
#[derive(Debug)]
pub struct Shared {
    state: Mutex<Replica>,
    changed: watch::Sender<u64>,
    persistence: ReplicaPersistence,
}

/// Handle to the shared replica state
pub type SharedReplica = Arc<Shared>;

impl Shared {
    /// Lock the replica state
    ///
    /// A poisoned lock is recovered rather than propagated; the replica
    /// is plain data and stays internally consistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Replica> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the replica to disk
    pub(crate) fn persist(&self, replica: &Replica) -> Result<(), StorageError> {
        self.persistence.save(replica)
    }

    /// Notify subscribers that the optimistic state changed
    pub(crate) fn mark_changed(&self) {
        self.changed.send_modify(|version| *version += 1);
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }
}

/// Unified storage interface for one replica binding
#[derive(Debug)]
pub struct Store {
    shared: SharedReplica,
    config: Config,
    name: String,
    token: String,
}

impl Store {
    /// Open the store, creating a new replica file if none exists
    ///
    /// Fails when the sync engine license key is not configured; that is
    /// a fatal startup condition, checked before anything touches disk.
    pub fn open(config: Config, name: &str, token: &str) -> Result<Self> {
        config.require_license_key()?;

        let persistence = ReplicaPersistence::new(config.replica_path(name));
        let replica = persistence
            .load_or_create()
            .context("Failed to load or create replica")?;

        info!(name, client_id = replica.client_id(), "opened replica");

        let (changed, _) = watch::channel(0u64);
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(replica),
                changed,
                persistence,
            }),
            config,
            name: name.to_string(),
            token: token.to_string(),
        })
    }

    /// The shared replica state, for the sync task
    pub fn shared(&self) -> SharedReplica {
        Arc::clone(&self.shared)
    }

    /// Subscribe to change notifications (the live-query primitive)
    ///
    /// The receiver yields a new value whenever the optimistic state
    /// changes, from a local mutation or an applied pull.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The replica name this store is bound to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The token captured when the store was opened
    pub fn auth_token(&self) -> &str {
        &self.token
    }

    // ==================== Mutators ====================

    /// Create a todo (uncompleted) at the given sort position
    pub fn create_todo(&self, id: &str, title: &str, order: f64) -> Result<(), StoreError> {
        self.mutate(|replica| replica.create_todo(id, title, order))
    }

    /// Update an existing todo's title and completion flag
    pub fn update_todo(&self, id: &str, title: &str, completed: bool) -> Result<(), StoreError> {
        self.mutate(|replica| replica.update_todo(id, title, completed))
    }

    /// Delete a todo (no-op when absent)
    pub fn delete_todo(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|replica| replica.delete_todo(id))
    }

    fn mutate<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Replica) -> Result<(), MutationError>,
    {
        {
            let mut replica = self.shared.lock();
            apply(&mut replica)?;
            self.shared.persist(&replica)?;
        }
        self.shared.mark_changed();
        Ok(())
    }

    // ==================== Read projection ====================

    /// All todos, sorted ascending by order
    pub fn todos(&self) -> Vec<Todo> {
        self.shared.lock().todos()
    }

    /// Get a todo by id
    pub fn get_todo(&self, id: &str) -> Option<Todo> {
        self.shared.lock().get_todo(id)
    }

    /// Number of live todos
    pub fn todo_count(&self) -> usize {
        self.shared.lock().todo_count()
    }

    /// Number of mutations awaiting server confirmation
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending().len()
    }

    /// The next free slot at the end of the list
    pub fn next_order(&self) -> f64 {
        self.shared.lock().next_order()
    }
}
