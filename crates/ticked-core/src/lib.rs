//! Ticked Core Library
//!
//! This crate provides the core functionality for Ticked, a local-first
//! todo list with account sync.
//!
//! # Architecture
//!
//! - **Replica**: a local key-value namespace holding the todo items,
//!   mutated only through three named mutators and kept in sync with a
//!   remote backend via push/pull reconciliation
//! - **Session**: a durable bearer token plus the in-memory signed-in user
//!
//! All reads are served directly from the in-memory replica; every local
//! write lands immediately and is reconciled with the backend in the
//! background.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Store::open(config, "todo-user", &token)?;
//!
//! // Add a todo
//! let id = models::new_todo_id();
//! store.create_todo(&id, "Buy milk", store.next_order())?;
//!
//! // Query todos (sorted by order)
//! let todos = store.todos();
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `replica`: The replicated namespace, mutators, and read projection
//! - `models`: The todo data structure and key mapping
//! - `session`: Durable token storage and the in-memory session
//! - `auth`: Sign-in/sign-up API client
//! - `sync`: Push/pull reconciliation with the remote backend
//! - `config`: Application configuration

pub mod auth;
pub mod config;
pub mod models;
pub mod replica;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;

pub use auth::{ApiClient, AuthError, SignInOk};
pub use config::Config;
pub use models::Todo;
pub use replica::{MutationError, Replica};
pub use session::{Session, SessionStore, User};
pub use storage::{ReplicaPersistence, StorageError};
pub use store::{SharedReplica, Store, StoreError};
