//! Todo command handlers

use anyhow::{bail, Result};

use ticked_core::{models, Store, Todo};

use crate::output::{short_id, Output};

/// Create a todo at the end of the list (or at an explicit position)
pub fn add(store: &Store, title: String, order: Option<f64>, output: &Output) -> Result<()> {
    let title = title.trim().to_string();
    if title.is_empty() {
        bail!("Todo text must not be empty.");
    }

    let id = models::new_todo_id();
    let order = order.unwrap_or_else(|| store.next_order());
    store.create_todo(&id, &title, order)?;

    if let Some(todo) = store.get_todo(&id) {
        output.print_todo(&todo);
    }
    Ok(())
}

/// List all todos, sorted by their order field
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_todos(&store.todos());
    Ok(())
}

/// Flip a todo's completion flag, title untouched
pub fn toggle(store: &Store, id: &str, output: &Output) -> Result<()> {
    let todo = resolve(store, id)?;
    store.update_todo(&todo.id, &todo.title, !todo.completed)?;

    let verb = if todo.completed { "Reopened" } else { "Completed" };
    output.success(&format!("{} {}", verb, todo.title));
    Ok(())
}

/// Replace a todo's text, completion flag untouched
pub fn edit(store: &Store, id: &str, title: String, output: &Output) -> Result<()> {
    let title = title.trim().to_string();
    if title.is_empty() {
        bail!("Todo text must not be empty.");
    }

    let todo = resolve(store, id)?;
    store.update_todo(&todo.id, &title, todo.completed)?;
    output.success(&format!("Updated {}", short_id(&todo.id)));
    Ok(())
}

/// Delete a todo
pub fn delete(store: &Store, id: &str, output: &Output) -> Result<()> {
    let todo = resolve(store, id)?;
    store.delete_todo(&todo.id)?;
    output.success(&format!("Deleted {}", todo.title));
    Ok(())
}

/// Resolve a full id or a unique prefix to a todo
fn resolve(store: &Store, id: &str) -> Result<Todo> {
    if let Some(todo) = store.get_todo(id) {
        return Ok(todo);
    }

    let mut matches: Vec<Todo> = store
        .todos()
        .into_iter()
        .filter(|todo| todo.id.starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No todo matching '{}'", id),
        1 => Ok(matches.remove(0)),
        n => bail!("Id '{}' is ambiguous ({} matches)", id, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;
    use ticked_core::Config;

    fn test_store(temp_dir: &TempDir) -> Store {
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.license_key = Some("lk-test".to_string());
        Store::open(config, "todo-user", "tok").unwrap()
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_add_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        add(&store, "Buy milk".to_string(), None, &quiet()).unwrap();
        add(&store, "Walk dog".to_string(), None, &quiet()).unwrap();

        let todos = store.todos();
        assert_eq!(todos.len(), 2);
        // Appended in order
        assert_eq!(todos[0].title, "Buy milk");
        assert_eq!(todos[1].title, "Walk dog");
        assert!(todos[0].order < todos[1].order);
    }

    #[test]
    fn test_add_rejects_empty_title() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        assert!(add(&store, "   ".to_string(), None, &quiet()).is_err());
        assert!(store.todos().is_empty());
    }

    #[test]
    fn test_add_with_explicit_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        add(&store, "Second".to_string(), Some(2.0), &quiet()).unwrap();
        add(&store, "First".to_string(), Some(1.0), &quiet()).unwrap();

        let todos = store.todos();
        let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_toggle_flips_completion() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();

        toggle(&store, "a1", &quiet()).unwrap();
        assert!(store.get_todo("a1").unwrap().completed);

        toggle(&store, "a1", &quiet()).unwrap();
        assert!(!store.get_todo("a1").unwrap().completed);
    }

    #[test]
    fn test_edit_keeps_completion() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();
        store.update_todo("a1", "Buy milk", true).unwrap();

        edit(&store, "a1", "Buy oat milk".to_string(), &quiet()).unwrap();

        let todo = store.get_todo("a1").unwrap();
        assert_eq!(todo.title, "Buy oat milk");
        assert!(todo.completed);
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();

        delete(&store, "a1", &quiet()).unwrap();
        assert!(store.todos().is_empty());
    }

    #[test]
    fn test_resolve_by_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("abc123", "One", 1.0).unwrap();
        store.create_todo("abd456", "Two", 2.0).unwrap();

        assert_eq!(resolve(&store, "abc").unwrap().title, "One");

        // Ambiguous prefix
        let err = resolve(&store, "ab").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));

        // No match
        let err = resolve(&store, "zz").unwrap_err();
        assert!(err.to_string().contains("No todo matching"));
    }
}
