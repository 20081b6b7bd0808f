//! The replicated namespace
//!
//! A `Replica` is the local working copy of one user's key-value
//! namespace. It is mutated only through three named mutators; every
//! successful mutation is applied optimistically and queued for replay
//! against the backend. Pull responses rewrite the namespace with the
//! server's patch, prune confirmed mutations, and re-apply the still
//! pending ones on top.
//!
//! The mutator wire names (`createMessage`, `updateMessage`,
//! `deleteMessage`) and argument shapes are fixed by the hosted backend,
//! which replays them server-side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{self, Todo, KEY_PREFIX};
use crate::sync::message::{MutationRecord, PatchOp, PullResponse};

/// Wire name of the create mutator
pub const MUTATION_CREATE: &str = "createMessage";
/// Wire name of the update mutator
pub const MUTATION_UPDATE: &str = "updateMessage";
/// Wire name of the delete mutator
pub const MUTATION_DELETE: &str = "deleteMessage";

/// Errors that can occur while applying a mutation
///
/// A failed mutation aborts: the namespace is left unchanged and nothing
/// is queued for replay.
#[derive(Error, Debug)]
pub enum MutationError {
    /// Update on an id that has no live item
    #[error("Todo '{0}' not found")]
    NotFound(String),

    /// Mutation name the client does not know (only possible on replay)
    #[error("Unknown mutation '{0}'")]
    UnknownMutation(String),

    /// Arguments did not match the mutator's contract
    #[error("Invalid arguments for '{name}': {details}")]
    InvalidArgs { name: String, details: String },
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    id: String,
    title: String,
    order: f64,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    id: String,
    title: String,
    completed: bool,
}

/// The local replica of one namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replica {
    /// Stable client id, generated once and persisted with the replica
    client_id: String,
    /// Opaque pull resume point handed back by the server
    cookie: Option<Value>,
    /// Highest mutation id the server has confirmed for this client
    last_mutation_id: u64,
    /// Id for the next local mutation
    next_mutation_id: u64,
    /// The key-value namespace
    kv: BTreeMap<String, Value>,
    /// Locally applied mutations awaiting confirmation
    pending: Vec<MutationRecord>,
}

impl Replica {
    /// Create a new empty replica with a fresh client id
    pub fn new() -> Self {
        Self {
            client_id: Uuid::new_v4().simple().to_string(),
            cookie: None,
            last_mutation_id: 0,
            next_mutation_id: 1,
            kv: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    /// Stable client id used in push/pull requests
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The pull cookie from the last reconciliation
    pub fn cookie(&self) -> Option<&Value> {
        self.cookie.as_ref()
    }

    /// Mutations applied locally but not yet confirmed by the server
    pub fn pending(&self) -> &[MutationRecord] {
        &self.pending
    }

    /// Highest mutation id the server has confirmed
    pub fn last_mutation_id(&self) -> u64 {
        self.last_mutation_id
    }

    // ==================== Mutators ====================

    /// Create a todo with the given id, title and sort order
    ///
    /// The item starts uncompleted. An existing item under the same id is
    /// overwritten, matching the backend's replay semantics.
    pub fn create_todo(&mut self, id: &str, title: &str, order: f64) -> Result<(), MutationError> {
        self.mutate(
            MUTATION_CREATE,
            json!({"id": id, "title": title, "order": order}),
        )
    }

    /// Update an existing todo's title and completion flag
    ///
    /// Fails with [`MutationError::NotFound`] when the id has no live
    /// item; the transaction aborts with no partial write.
    pub fn update_todo(
        &mut self,
        id: &str,
        title: &str,
        completed: bool,
    ) -> Result<(), MutationError> {
        self.mutate(
            MUTATION_UPDATE,
            json!({"id": id, "title": title, "completed": completed}),
        )
    }

    /// Delete a todo
    ///
    /// Deleting an id with no live item is a no-op, not an error.
    pub fn delete_todo(&mut self, id: &str) -> Result<(), MutationError> {
        self.mutate(MUTATION_DELETE, json!(id))
    }

    /// Apply a mutation locally and queue it for replay
    fn mutate(&mut self, name: &str, args: Value) -> Result<(), MutationError> {
        apply_mutation(&mut self.kv, name, &args)?;

        let id = self.next_mutation_id;
        self.next_mutation_id += 1;
        self.pending.push(MutationRecord {
            id,
            name: name.to_string(),
            args,
        });
        Ok(())
    }

    // ==================== Read projection ====================

    /// All todos, sorted ascending by their order field
    ///
    /// Ties keep the namespace key order (stable). Entries that do not
    /// decode as todos are skipped.
    pub fn todos(&self) -> Vec<Todo> {
        let mut todos: Vec<Todo> = self
            .kv
            .iter()
            .filter(|(key, _)| key.starts_with(KEY_PREFIX))
            .filter_map(|(key, value)| {
                let todo = Todo::from_entry(key, value);
                if todo.is_none() {
                    debug!(key = %key, "skipping undecodable namespace entry");
                }
                todo
            })
            .collect();

        todos.sort_by(|a, b| {
            a.order
                .partial_cmp(&b.order)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        todos
    }

    /// Get a single todo by id
    pub fn get_todo(&self, id: &str) -> Option<Todo> {
        let key = models::key_for(id);
        self.kv.get(&key).and_then(|value| Todo::from_entry(&key, value))
    }

    /// Number of live todos
    pub fn todo_count(&self) -> usize {
        self.kv.keys().filter(|key| key.starts_with(KEY_PREFIX)).count()
    }

    /// The next free slot at the end of the list
    pub fn next_order(&self) -> f64 {
        self.todos()
            .iter()
            .map(|todo| todo.order)
            .fold(0.0, f64::max)
            + 1.0
    }

    // ==================== Reconciliation ====================

    /// Apply a pull response
    ///
    /// Rewrites the namespace with the server patch, advances the cookie
    /// and confirmation watermark, prunes confirmed mutations, and
    /// re-applies the surviving pending mutations optimistically. A
    /// pending mutation that no longer applies (e.g. an update whose
    /// target vanished) is dropped, matching its abort semantics.
    ///
    /// Returns true if the namespace content changed (pruning alone is
    /// not a visible change).
    pub fn apply_pull(&mut self, response: &PullResponse) -> bool {
        let kv_before = self.kv.clone();

        for op in &response.patch {
            apply_patch_op(&mut self.kv, op);
        }

        self.cookie = response.cookie.clone();
        if response.last_mutation_id > self.last_mutation_id {
            self.last_mutation_id = response.last_mutation_id;
        }
        self.pending
            .retain(|record| record.id > response.last_mutation_id);

        // Rebase: replay unconfirmed mutations on top of the server view
        let survivors = std::mem::take(&mut self.pending);
        for record in survivors {
            match apply_mutation(&mut self.kv, &record.name, &record.args) {
                Ok(()) => self.pending.push(record),
                Err(e) => {
                    debug!(
                        mutation = record.id,
                        name = %record.name,
                        "dropping mutation during rebase: {e}"
                    );
                }
            }
        }

        self.kv != kv_before
    }
}

impl Default for Replica {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one named mutation to the namespace
///
/// This single path serves both local mutator calls and rebase replay, so
/// optimistic and replayed semantics cannot diverge.
pub(crate) fn apply_mutation(
    kv: &mut BTreeMap<String, Value>,
    name: &str,
    args: &Value,
) -> Result<(), MutationError> {
    match name {
        MUTATION_CREATE => {
            let args: CreateArgs = parse_args(name, args)?;
            kv.insert(
                models::key_for(&args.id),
                json!({"title": args.title, "completed": false, "order": args.order}),
            );
            Ok(())
        }
        MUTATION_UPDATE => {
            let args: UpdateArgs = parse_args(name, args)?;
            let key = models::key_for(&args.id);
            // The order field survives updates; only title and completion move.
            let order = match kv.get(&key) {
                Some(existing) => existing.get("order").and_then(Value::as_f64).unwrap_or(0.0),
                None => return Err(MutationError::NotFound(args.id)),
            };
            kv.insert(
                key,
                json!({"title": args.title, "completed": args.completed, "order": order}),
            );
            Ok(())
        }
        MUTATION_DELETE => {
            let id = args.as_str().ok_or_else(|| MutationError::InvalidArgs {
                name: name.to_string(),
                details: "expected the todo id as a string".to_string(),
            })?;
            kv.remove(&models::key_for(id));
            Ok(())
        }
        other => Err(MutationError::UnknownMutation(other.to_string())),
    }
}

fn parse_args<'de, T: Deserialize<'de>>(name: &str, args: &'de Value) -> Result<T, MutationError> {
    T::deserialize(args).map_err(|e| MutationError::InvalidArgs {
        name: name.to_string(),
        details: e.to_string(),
    })
}

/// Apply one pull patch operation to the namespace
fn apply_patch_op(kv: &mut BTreeMap<String, Value>, op: &PatchOp) {
    match op {
        PatchOp::Put { key, value } => {
            kv.insert(key.clone(), value.clone());
        }
        PatchOp::Del { key } => {
            kv.remove(key);
        }
        PatchOp::Clear => {
            kv.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();

        let todos = replica.todos();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, "a1");
        assert_eq!(todos[0].title, "Buy milk");
        assert!(!todos[0].completed);

        let queued = replica.pending();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, 1);
        assert_eq!(queued[0].name, MUTATION_CREATE);
    }

    #[test]
    fn test_update_existing() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 2.5).unwrap();
        replica.update_todo("a1", "Buy oat milk", true).unwrap();

        let todo = replica.get_todo("a1").unwrap();
        assert_eq!(todo.title, "Buy oat milk");
        assert!(todo.completed);
        // Order survives updates
        assert_eq!(todo.order, 2.5);
    }

    #[test]
    fn test_update_missing_aborts() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();
        let before = replica.todos();

        let err = replica.update_todo("nope", "x", true).unwrap_err();
        assert!(matches!(err, MutationError::NotFound(ref id) if id == "nope"));

        // Projection unchanged, nothing queued for the failed mutation
        assert_eq!(replica.todos(), before);
        assert_eq!(replica.pending().len(), 1);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();
        let before = replica.todos();

        replica.delete_todo("nope").unwrap();
        assert_eq!(replica.todos(), before);
    }

    #[test]
    fn test_projection_sorted_by_order() {
        let mut replica = Replica::new();
        replica.create_todo("c", "third", 30.0).unwrap();
        replica.create_todo("a", "first", 10.0).unwrap();
        replica.create_todo("b", "second", 20.0).unwrap();

        let todos = replica.todos();
        let ids: Vec<&str> = todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_projection_ties_are_stable() {
        let mut replica = Replica::new();
        replica.create_todo("z2", "late key", 1.0).unwrap();
        replica.create_todo("z1", "early key", 1.0).unwrap();

        // Same order: the namespace key order decides, on every read
        let todos = replica.todos();
        let ids: Vec<&str> = todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["z1", "z2"]);
        let ids_again: Vec<String> = replica.todos().into_iter().map(|t| t.id).collect();
        assert_eq!(ids_again, vec!["z1", "z2"]);
    }

    #[test]
    fn test_next_order() {
        let mut replica = Replica::new();
        assert_eq!(replica.next_order(), 1.0);

        replica.create_todo("a1", "x", 4.0).unwrap();
        assert_eq!(replica.next_order(), 5.0);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut replica = Replica::new();

        replica.create_todo("a1", "Buy milk", 1.0).unwrap();
        let todos = replica.todos();
        assert_eq!(todos.len(), 1);
        assert!(!todos[0].completed);

        // Toggle the checkbox
        replica.update_todo("a1", "Buy milk", true).unwrap();
        let todo = replica.get_todo("a1").unwrap();
        assert!(todo.completed);
        assert_eq!(todo.title, "Buy milk");

        // Edit the title, completion untouched
        replica.update_todo("a1", "Buy oat milk", true).unwrap();
        let todo = replica.get_todo("a1").unwrap();
        assert_eq!(todo.title, "Buy oat milk");
        assert!(todo.completed);

        replica.delete_todo("a1").unwrap();
        assert!(replica.todos().is_empty());
    }

    #[test]
    fn test_mutation_ids_monotonic() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "x", 1.0).unwrap();
        replica.update_todo("a1", "y", false).unwrap();
        replica.delete_todo("a1").unwrap();

        let ids: Vec<u64> = replica.pending().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_apply_pull_patch_and_prune() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();

        // Server confirms mutation 1 and hands back its view of the item
        let response: PullResponse = serde_json::from_value(serde_json::json!({
            "cookie": 10,
            "lastMutationID": 1,
            "patch": [
                {"op": "put", "key": "message/a1",
                 "value": {"title": "Buy milk", "completed": false, "order": 1.0}}
            ]
        }))
        .unwrap();

        let changed = replica.apply_pull(&response);
        assert!(!changed, "server view matches the optimistic state");
        assert!(replica.pending().is_empty());
        assert_eq!(replica.last_mutation_id(), 1);
        assert_eq!(replica.todos().len(), 1);
    }

    #[test]
    fn test_apply_pull_rebases_unconfirmed_mutations() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();

        // Server has not seen mutation 1 yet but another device added a2
        let response: PullResponse = serde_json::from_value(serde_json::json!({
            "cookie": 3,
            "lastMutationID": 0,
            "patch": [
                {"op": "put", "key": "message/a2",
                 "value": {"title": "Walk dog", "completed": false, "order": 2.0}}
            ]
        }))
        .unwrap();

        let changed = replica.apply_pull(&response);
        assert!(changed);

        // Both the remote item and the rebased local one are visible
        let todos = replica.todos();
        let ids: Vec<&str> = todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert_eq!(replica.pending().len(), 1);
    }

    #[test]
    fn test_apply_pull_clear_resync() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "local", 1.0).unwrap();

        let response: PullResponse = serde_json::from_value(serde_json::json!({
            "cookie": 1,
            "lastMutationID": 1,
            "patch": [
                {"op": "clear"},
                {"op": "put", "key": "message/srv",
                 "value": {"title": "from server", "completed": true, "order": 1.0}}
            ]
        }))
        .unwrap();

        replica.apply_pull(&response);

        let todos = replica.todos();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, "srv");
        assert!(replica.pending().is_empty());
    }

    #[test]
    fn test_rebase_drops_update_on_vanished_item() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();
        replica.update_todo("a1", "Buy oat milk", false).unwrap();

        // Server confirmed the create but another device deleted the item
        let response: PullResponse = serde_json::from_value(serde_json::json!({
            "cookie": 2,
            "lastMutationID": 1,
            "patch": [{"op": "del", "key": "message/a1"}]
        }))
        .unwrap();

        replica.apply_pull(&response);

        // The unreplayable update is gone along with the item
        assert!(replica.todos().is_empty());
        assert!(replica.pending().is_empty());
    }

    #[test]
    fn test_unknown_mutation_rejected() {
        let mut kv = BTreeMap::new();
        let err = apply_mutation(&mut kv, "renameMessage", &json!({})).unwrap_err();
        assert!(matches!(err, MutationError::UnknownMutation(_)));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut replica = Replica::new();
        replica.create_todo("a1", "Buy milk", 1.0).unwrap();

        let json = serde_json::to_string(&replica).unwrap();
        let loaded: Replica = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.client_id(), replica.client_id());
        assert_eq!(loaded.todos(), replica.todos());
        assert_eq!(loaded.pending(), replica.pending());
    }
}
