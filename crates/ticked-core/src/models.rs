//! Data model for Ticked
//!
//! Defines the todo item and its mapping onto the replicated key-value
//! namespace. Items live under the `message/` key prefix; the prefix and
//! the stored value shape are fixed by the hosted sync backend and must
//! not be renamed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Key prefix for todo items in the replicated namespace.
pub const KEY_PREFIX: &str = "message/";

/// A todo item as seen by the read projection.
///
/// The `id` lives in the key, not the stored value; `TodoValue` is the
/// shape that actually sits in the namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    /// Unique identifier, generated client-side at creation
    pub id: String,
    /// Free-form text content
    pub title: String,
    /// Completion flag, false at creation
    pub completed: bool,
    /// Sort key for the read projection (ascending)
    pub order: f64,
}

/// The value stored under a `message/<id>` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoValue {
    pub title: String,
    pub completed: bool,
    pub order: f64,
}

impl Todo {
    /// Reconstruct a todo from a namespace entry.
    ///
    /// Returns `None` if the key is not under the todo prefix or the
    /// value does not decode.
    pub fn from_entry(key: &str, value: &Value) -> Option<Self> {
        let id = id_from_key(key)?;
        let value: TodoValue = serde_json::from_value(value.clone()).ok()?;
        Some(Self {
            id: id.to_string(),
            title: value.title,
            completed: value.completed,
            order: value.order,
        })
    }

    /// The namespace key for this todo.
    pub fn key(&self) -> String {
        key_for(&self.id)
    }

    /// The stored value for this todo.
    pub fn value(&self) -> TodoValue {
        TodoValue {
            title: self.title.clone(),
            completed: self.completed,
            order: self.order,
        }
    }
}

/// Build the namespace key for a todo id.
pub fn key_for(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Extract the todo id from a namespace key.
///
/// Returns `None` for keys outside the todo prefix.
pub fn id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}

/// Generate a new collision-resistant todo id.
pub fn new_todo_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_round_trip() {
        let key = key_for("a1");
        assert_eq!(key, "message/a1");
        assert_eq!(id_from_key(&key), Some("a1"));
        assert_eq!(id_from_key("other/a1"), None);
    }

    #[test]
    fn test_from_entry() {
        let value = json!({"title": "Buy milk", "completed": false, "order": 1.0});
        let todo = Todo::from_entry("message/a1", &value).unwrap();
        assert_eq!(todo.id, "a1");
        assert_eq!(todo.title, "Buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.order, 1.0);
    }

    #[test]
    fn test_from_entry_rejects_foreign_keys() {
        let value = json!({"title": "x", "completed": false, "order": 0.0});
        assert!(Todo::from_entry("settings/theme", &value).is_none());
    }

    #[test]
    fn test_from_entry_rejects_malformed_value() {
        assert!(Todo::from_entry("message/a1", &json!("not an object")).is_none());
        assert!(Todo::from_entry("message/a1", &json!({"title": "x"})).is_none());
    }

    #[test]
    fn test_new_todo_id_unique() {
        let a = new_todo_id();
        let b = new_todo_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_value_round_trip() {
        let todo = Todo {
            id: "a1".to_string(),
            title: "Buy milk".to_string(),
            completed: true,
            order: 2.5,
        };
        let value = serde_json::to_value(todo.value()).unwrap();
        let back = Todo::from_entry(&todo.key(), &value).unwrap();
        assert_eq!(back, todo);
    }
}
