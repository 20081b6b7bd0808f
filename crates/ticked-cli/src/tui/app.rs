//! Application state and logic

use std::time::Instant;

use ticked_core::sync::SyncStatus;
use ticked_core::{models, Session, Store, Todo};

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    SignUp,
    Todos,
}

/// Focused field on the auth forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Password,
    Confirm,
}

impl Default for AuthField {
    fn default() -> Self {
        AuthField::Username
    }
}

impl AuthField {
    /// Cycle to the next field (the confirm field exists only on sign-up)
    pub fn next(self, route: Route) -> Self {
        match (self, route) {
            (AuthField::Username, _) => AuthField::Password,
            (AuthField::Password, Route::SignUp) => AuthField::Confirm,
            _ => AuthField::Username,
        }
    }
}

/// Sign-in / sign-up form state
#[derive(Debug, Default)]
pub struct AuthForm {
    pub username: String,
    pub password: String,
    pub confirm: String,
    pub focus: AuthField,
}

impl AuthForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The field the cursor is in
    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::Username => &mut self.username,
            AuthField::Password => &mut self.password,
            AuthField::Confirm => &mut self.confirm,
        }
    }
}

/// Input mode on the todos screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Typing a new todo into the input line
    Insert,
    /// Editing the selected todo's text inline
    Edit,
}

/// Draft for the one item being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: String,
    pub text: String,
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current screen
    pub route: Route,
    /// Sign-in / sign-up form state
    pub form: AuthForm,
    /// In-memory session (set by sign-in, cleared by logout)
    pub session: Session,
    /// Current input mode on the todos screen
    pub input_mode: InputMode,
    /// New-todo input line
    pub input: String,
    /// At most one item is editable at a time; starting another edit
    /// overwrites this draft
    pub editing: Option<EditDraft>,
    /// Current projection of the todo list
    pub todos: Vec<Todo>,
    /// Currently selected todo index
    pub selected: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Sync status indicator
    pub sync_status: SyncStatus,
}

impl App {
    pub fn new(route: Route) -> Self {
        Self {
            should_quit: false,
            route,
            form: AuthForm::default(),
            session: Session::new(),
            input_mode: InputMode::Normal,
            input: String::new(),
            editing: None,
            todos: Vec::new(),
            selected: 0,
            status_message: None,
            status_message_time: None,
            sync_status: SyncStatus::Disconnected,
        }
    }

    // ==================== Navigation ====================

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.todos.len() {
            self.selected += 1;
        }
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        self.todos.get(self.selected)
    }

    // ==================== Live query ====================

    /// Re-run the read projection and clamp view state to it
    pub fn refresh(&mut self, store: &Store) {
        self.todos = store.todos();
        if self.selected >= self.todos.len() {
            self.selected = self.todos.len().saturating_sub(1);
        }
        // An open draft survives only while its item exists
        if let Some(draft) = &self.editing {
            if !self.todos.iter().any(|todo| todo.id == draft.id) {
                self.editing = None;
                self.input_mode = InputMode::Normal;
            }
        }
    }

    // ==================== New-todo input ====================

    /// Create a todo from the input line
    ///
    /// Returns true if a mutation was issued.
    pub fn submit_input(&mut self, store: &Store) -> bool {
        let title = self.input.trim().to_string();
        if title.is_empty() {
            return false;
        }

        let id = models::new_todo_id();
        match store.create_todo(&id, &title, store.next_order()) {
            Ok(()) => {
                self.input.clear();
                self.refresh(store);
                true
            }
            Err(e) => {
                self.set_status(format!("Create failed: {e}"));
                false
            }
        }
    }

    // ==================== Edit state machine ====================

    /// Viewing -> Editing: capture the selected item's title as the draft
    ///
    /// Any previously open draft is discarded.
    pub fn begin_edit(&mut self) {
        if let Some(todo) = self.selected_todo() {
            self.editing = Some(EditDraft {
                id: todo.id.clone(),
                text: todo.title.clone(),
            });
            self.input_mode = InputMode::Edit;
        }
    }

    /// Editing -> Viewing (commit): update with the draft text, keeping
    /// the item's completion flag, then clear the draft
    pub fn save_edit(&mut self, store: &Store) -> bool {
        let Some(draft) = self.editing.take() else {
            return false;
        };
        self.input_mode = InputMode::Normal;

        let Some(todo) = store.get_todo(&draft.id) else {
            self.set_status("Todo disappeared while editing".to_string());
            return false;
        };

        match store.update_todo(&draft.id, draft.text.trim(), todo.completed) {
            Ok(()) => {
                self.refresh(store);
                true
            }
            Err(e) => {
                self.set_status(format!("Update failed: {e}"));
                false
            }
        }
    }

    /// Editing -> Viewing (discard): clear the draft without mutating
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.input_mode = InputMode::Normal;
    }

    // ==================== Viewing-state actions ====================

    /// Flip the selected item's completion flag, title untouched
    pub fn toggle_selected(&mut self, store: &Store) -> bool {
        let Some(todo) = self.selected_todo().cloned() else {
            return false;
        };
        match store.update_todo(&todo.id, &todo.title, !todo.completed) {
            Ok(()) => {
                self.refresh(store);
                true
            }
            Err(e) => {
                self.set_status(format!("Update failed: {e}"));
                false
            }
        }
    }

    /// Delete the selected item immediately, no confirmation step
    pub fn delete_selected(&mut self, store: &Store) -> bool {
        let Some(todo) = self.selected_todo().cloned() else {
            return false;
        };
        match store.delete_todo(&todo.id) {
            Ok(()) => {
                self.refresh(store);
                true
            }
            Err(e) => {
                self.set_status(format!("Delete failed: {e}"));
                false
            }
        }
    }

    // ==================== Status line ====================

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_message_time = Some(Instant::now());
    }

    /// Auto-dismiss the status message after a few seconds
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 4 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ticked_core::Config;

    fn test_store(temp_dir: &TempDir) -> Store {
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        config.license_key = Some("lk-test".to_string());
        Store::open(config, "todo-user", "tok").unwrap()
    }

    fn app_with(store: &Store) -> App {
        let mut app = App::new(Route::Todos);
        app.refresh(store);
        app
    }

    #[test]
    fn test_empty_projection_renders_empty_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let app = app_with(&store);

        assert!(app.todos.is_empty());
        assert!(app.selected_todo().is_none());
    }

    #[test]
    fn test_submit_input_creates_and_clears() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let mut app = app_with(&store);

        app.input = "Buy milk".to_string();
        assert!(app.submit_input(&store));

        assert!(app.input.is_empty());
        assert_eq!(app.todos.len(), 1);
        assert_eq!(app.todos[0].title, "Buy milk");
        assert!(!app.todos[0].completed);

        // Blank input issues nothing
        app.input = "   ".to_string();
        assert!(!app.submit_input(&store));
        assert_eq!(app.todos.len(), 1);
    }

    #[test]
    fn test_edit_commit() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();
        store.update_todo("a1", "Buy milk", true).unwrap();
        let mut app = app_with(&store);

        app.begin_edit();
        assert_eq!(app.input_mode, InputMode::Edit);
        assert_eq!(app.editing.as_ref().unwrap().text, "Buy milk");

        app.editing.as_mut().unwrap().text = "Buy oat milk".to_string();
        assert!(app.save_edit(&store));

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.editing.is_none());
        let todo = store.get_todo("a1").unwrap();
        assert_eq!(todo.title, "Buy oat milk");
        // Completion flag survives the edit
        assert!(todo.completed);
    }

    #[test]
    fn test_edit_cancel_discards_draft() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();
        let mut app = app_with(&store);

        app.begin_edit();
        app.editing.as_mut().unwrap().text = "Something else".to_string();
        app.cancel_edit();

        assert!(app.editing.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(store.get_todo("a1").unwrap().title, "Buy milk");
    }

    #[test]
    fn test_starting_new_edit_discards_other_draft() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "First", 1.0).unwrap();
        store.create_todo("a2", "Second", 2.0).unwrap();
        let mut app = app_with(&store);

        // Start editing the first item and type into its draft
        app.begin_edit();
        app.editing.as_mut().unwrap().text = "First (changed)".to_string();

        // Start editing the second item without saving
        app.selected = 1;
        app.begin_edit();

        let draft = app.editing.as_ref().unwrap();
        assert_eq!(draft.id, "a2");
        assert_eq!(draft.text, "Second");

        // The first item's stored title is unchanged
        assert_eq!(store.get_todo("a1").unwrap().title, "First");
    }

    #[test]
    fn test_toggle_selected() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();
        let mut app = app_with(&store);

        assert!(app.toggle_selected(&store));
        assert!(app.todos[0].completed);
        assert_eq!(app.todos[0].title, "Buy milk");

        assert!(app.toggle_selected(&store));
        assert!(!app.todos[0].completed);
    }

    #[test]
    fn test_delete_selected_clamps_selection() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "First", 1.0).unwrap();
        store.create_todo("a2", "Second", 2.0).unwrap();
        let mut app = app_with(&store);

        app.selected = 1;
        assert!(app.delete_selected(&store));

        assert_eq!(app.todos.len(), 1);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_refresh_drops_draft_of_vanished_item() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        store.create_todo("a1", "Buy milk", 1.0).unwrap();
        let mut app = app_with(&store);

        app.begin_edit();
        assert!(app.editing.is_some());

        // Another device deletes the item; the next refresh notices
        store.delete_todo("a1").unwrap();
        app.refresh(&store);

        assert!(app.editing.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_auth_field_cycle() {
        // Sign-in has two fields
        assert_eq!(
            AuthField::Username.next(Route::SignIn),
            AuthField::Password
        );
        assert_eq!(
            AuthField::Password.next(Route::SignIn),
            AuthField::Username
        );

        // Sign-up adds the confirm field
        assert_eq!(
            AuthField::Password.next(Route::SignUp),
            AuthField::Confirm
        );
        assert_eq!(
            AuthField::Confirm.next(Route::SignUp),
            AuthField::Username
        );
    }

    #[test]
    fn test_status_message_lifecycle() {
        let mut app = App::new(Route::SignIn);
        app.set_status("hello".to_string());
        assert!(app.status_message.is_some());

        // Not yet expired
        app.check_status_timeout();
        assert!(app.status_message.is_some());
    }
}
