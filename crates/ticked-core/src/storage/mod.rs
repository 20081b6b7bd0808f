//! Storage layer
//!
//! Handles persistence of the replicated namespace.
//!
//! ## Architecture
//!
//! - The in-memory replica is the working copy
//! - Each replica is persisted as a JSON file in the data directory and
//!   rewritten atomically after every local mutation and every pull
//!
//! The session token is stored as its own small file, written through the
//! same atomic path.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::ReplicaPersistence;
