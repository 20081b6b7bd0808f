//! Ticked TUI
//!
//! Terminal user interface for Ticked - local-first todo list with
//! account sync.
//!
//! ## Screens
//!
//! - Sign In / Sign Up: account forms; the stored token decides which
//!   screen opens first
//! - Todos: input line, todo list, status bar with sync indicator
//!
//! ## Keys (todos screen)
//!
//! - j/k or ↑/↓: Move selection up/down
//! - i: Type a new todo
//! - Space: Toggle completion
//! - e: Edit the selected todo inline
//! - d: Delete the selected todo
//! - L: Logout
//! - q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticked_core::sync::{
    spawn_sync_task, SyncClient, SyncCommand, SyncHandle, SyncTaskConfig, SyncTaskEvent,
};
use ticked_core::{ApiClient, AuthError, Config, SessionStore, Store};

use app::{App, AuthField, InputMode, Route};

use crate::REPLICA_NAME;

/// A store binding plus its background sync task
///
/// Created when the todos screen mounts, shut down when it unmounts.
/// The binding captures the token at mount time; a re-login gets a
/// fresh one.
struct Mounted {
    store: Store,
    handle: SyncHandle,
}

/// Run the TUI application
pub async fn run() -> Result<()> {
    let config = Config::load()?;

    // Initialize TUI logging (file-based, only if TICKED_LOG is set)
    init_tui_logging(&config);

    let session_store = SessionStore::new(&config);

    // Route guard: a stored token opens the todos screen directly,
    // anything else lands on sign-in
    let mut mounted: Option<Mounted> = None;
    let mut changed_rx: Option<watch::Receiver<u64>> = None;
    let mut app = if session_store.token().is_some() {
        let m = mount(&config, &session_store)?;
        let mut app = App::new(Route::Todos);
        app.refresh(&m.store);
        changed_rx = Some(m.store.subscribe());
        mounted = Some(m);
        app
    } else {
        App::new(Route::SignIn)
    };

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(
        &mut terminal,
        &mut app,
        &config,
        &session_store,
        &mut mounted,
        &mut changed_rx,
    )
    .await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// Open the store bound to the stored token and start its sync task
fn mount(config: &Config, session_store: &SessionStore) -> Result<Mounted> {
    let Some(token) = session_store.token() else {
        anyhow::bail!("Not signed in");
    };

    let store = Store::open(config.clone(), REPLICA_NAME, &token)?;
    let client = SyncClient::new(store.config(), store.auth_token());
    let handle = spawn_sync_task(client, store.shared(), SyncTaskConfig::from_config(config));

    Ok(Mounted { store, handle })
}

/// Shut down the sync task and release the store binding
async fn unmount(mounted: &mut Option<Mounted>, changed_rx: &mut Option<watch::Receiver<u64>>) {
    if let Some(m) = mounted.take() {
        let _ = m.handle.command_tx.send(SyncCommand::Shutdown).await;
    }
    *changed_rx = None;
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
    session_store: &SessionStore,
    mounted: &mut Option<Mounted>,
    changed_rx: &mut Option<watch::Receiver<u64>>,
) -> Result<()> {
    let api = ApiClient::new(config);

    // Track if we need to push changes after this iteration
    let mut pending_push = false;

    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            biased;

            // Check for sync task events (if a store is mounted)
            sync_event = async {
                match mounted.as_mut() {
                    Some(m) => m.handle.event_rx.recv().await,
                    None => std::future::pending::<Option<SyncTaskEvent>>().await,
                }
            } => {
                if let Some(event) = sync_event {
                    match event {
                        SyncTaskEvent::StatusChanged(status) => {
                            app.sync_status = status;
                        }
                        SyncTaskEvent::Updated => {
                            // Remote changes landed - re-run the live query
                            if let Some(m) = mounted.as_ref() {
                                app.refresh(&m.store);
                                app.set_status("Synced remote changes".to_string());
                            }
                        }
                        SyncTaskEvent::Error(msg) => {
                            app.set_status(format!("Sync error: {msg}"));
                        }
                    }
                }
            }

            // Re-run the live query when the store signals a change
            ok = async {
                match changed_rx.as_mut() {
                    Some(rx) => rx.changed().await.is_ok(),
                    None => std::future::pending::<bool>().await,
                }
            } => {
                if ok {
                    if let Some(m) = mounted.as_ref() {
                        app.refresh(&m.store);
                    }
                } else {
                    // Sender gone; the binding was released
                    *changed_rx = None;
                }
            }

            // Poll for terminal events
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                // Push changes if needed
                if pending_push {
                    pending_push = false;
                    if let Some(m) = mounted.as_ref() {
                        // Nudge the sync task to reconcile now
                        let _ = m.handle.command_tx.send(SyncCommand::PushNow).await;
                    }
                }

                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        let needs_push = match app.route {
                            Route::Todos => {
                                handle_todos_key(
                                    app,
                                    session_store,
                                    mounted,
                                    changed_rx,
                                    key.code,
                                    key.modifiers,
                                )
                                .await?
                            }
                            Route::SignIn | Route::SignUp => {
                                handle_auth_key(
                                    app,
                                    &api,
                                    config,
                                    session_store,
                                    mounted,
                                    changed_rx,
                                    key.code,
                                    key.modifiers,
                                )
                                .await?
                            }
                        };

                        if needs_push {
                            pending_push = true;
                        }
                    }
                }
            }
        }

        if app.should_quit {
            unmount(mounted, changed_rx).await;
            break;
        }
    }

    Ok(())
}

/// Handle key events on the todos screen
///
/// Returns true if local changes need to be pushed.
async fn handle_todos_key(
    app: &mut App,
    session_store: &SessionStore,
    mounted: &mut Option<Mounted>,
    changed_rx: &mut Option<watch::Receiver<u64>>,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<bool> {
    let Some(m) = mounted.as_ref() else {
        // No binding (should not happen on this route); fall back to sign-in
        app.route = Route::SignIn;
        return Ok(false);
    };

    match app.input_mode {
        InputMode::Normal => match code {
            // Quit
            KeyCode::Char('q') => {
                app.should_quit = true;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true;
            }

            // Navigation
            KeyCode::Char('k') | KeyCode::Up => {
                app.status_message = None;
                app.move_up();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                app.status_message = None;
                app.move_down();
            }

            // New todo
            KeyCode::Char('i') | KeyCode::Char('a') => {
                app.input_mode = InputMode::Insert;
            }

            // Toggle completion
            KeyCode::Char(' ') => {
                return Ok(app.toggle_selected(&m.store));
            }

            // Inline edit
            KeyCode::Char('e') => {
                app.begin_edit();
            }

            // Delete, no confirmation step
            KeyCode::Char('d') => {
                return Ok(app.delete_selected(&m.store));
            }

            // Logout
            KeyCode::Char('L') => {
                logout(app, session_store, mounted, changed_rx).await?;
            }

            _ => {}
        },

        InputMode::Insert => match code {
            KeyCode::Esc => {
                app.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                return Ok(app.submit_input(&m.store));
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => {
                app.input.push(c);
            }
            _ => {}
        },

        InputMode::Edit => match code {
            KeyCode::Esc => {
                app.cancel_edit();
            }
            KeyCode::Enter => {
                return Ok(app.save_edit(&m.store));
            }
            KeyCode::Backspace => {
                if let Some(draft) = app.editing.as_mut() {
                    draft.text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(draft) = app.editing.as_mut() {
                    draft.text.push(c);
                }
            }
            _ => {}
        },
    }

    Ok(false)
}

/// Handle key events on the sign-in and sign-up screens
#[allow(clippy::too_many_arguments)]
async fn handle_auth_key(
    app: &mut App,
    api: &ApiClient,
    config: &Config,
    session_store: &SessionStore,
    mounted: &mut Option<Mounted>,
    changed_rx: &mut Option<watch::Receiver<u64>>,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<bool> {
    match code {
        KeyCode::Esc => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Switch between sign-in and sign-up
        KeyCode::Char('n') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.route = match app.route {
                Route::SignIn => Route::SignUp,
                _ => Route::SignIn,
            };
            app.form.password.clear();
            app.form.confirm.clear();
            app.form.focus = AuthField::Username;
            app.status_message = None;
        }

        KeyCode::Tab | KeyCode::Down => {
            app.form.focus = app.form.focus.next(app.route);
        }

        KeyCode::Enter => match app.route {
            Route::SignIn => {
                submit_sign_in(app, api, config, session_store, mounted, changed_rx).await?;
            }
            _ => {
                submit_sign_up(app, api).await;
            }
        },

        KeyCode::Backspace => {
            app.form.field_mut().pop();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            app.form.field_mut().push(c);
        }
        _ => {}
    }

    Ok(false)
}

/// Submit the sign-in form
///
/// On success: persist the token, establish the session, and mount a
/// fresh store binding for the todos screen.
async fn submit_sign_in(
    app: &mut App,
    api: &ApiClient,
    config: &Config,
    session_store: &SessionStore,
    mounted: &mut Option<Mounted>,
    changed_rx: &mut Option<watch::Receiver<u64>>,
) -> Result<()> {
    let username = app.form.username.trim().to_string();
    let password = app.form.password.clone();
    if username.is_empty() || password.is_empty() {
        app.set_status("Username and password are required".to_string());
        return Ok(());
    }

    app.set_status("Signing in...".to_string());
    match api.sign_in(&username, &password).await {
        Ok(ok) => {
            session_store.store_token(&ok.token)?;
            app.session.login(&ok.user_name, &ok.token);

            let m = mount(config, session_store)?;
            app.refresh(&m.store);
            *changed_rx = Some(m.store.subscribe());
            *mounted = Some(m);

            app.form.clear();
            app.input_mode = InputMode::Normal;
            app.route = Route::Todos;
            app.set_status(format!("Signed in as {}", ok.user_name));
        }
        Err(AuthError::InvalidPassword) => {
            app.set_status("Invalid username or password".to_string());
        }
        Err(e) => {
            app.set_status(format!("Sign-in failed: {e}"));
        }
    }
    Ok(())
}

/// Submit the sign-up form
///
/// A password mismatch is rejected locally, before any network call.
/// Success establishes no session; the user signs in separately.
async fn submit_sign_up(app: &mut App, api: &ApiClient) {
    let username = app.form.username.trim().to_string();
    let password = app.form.password.clone();
    if username.is_empty() || password.is_empty() {
        app.set_status("Username and password are required".to_string());
        return;
    }
    if password != app.form.confirm {
        app.set_status("Passwords don't match!".to_string());
        return;
    }

    app.set_status("Creating account...".to_string());
    match api.sign_up(&username, &password).await {
        Ok(()) => {
            app.form.password.clear();
            app.form.confirm.clear();
            app.form.focus = AuthField::Username;
            app.route = Route::SignIn;
            app.set_status("Account created - sign in to continue".to_string());
        }
        Err(e) => {
            app.set_status(format!("Sign-up failed: {e}"));
        }
    }
}

/// End the session and return to the sign-in screen
async fn logout(
    app: &mut App,
    session_store: &SessionStore,
    mounted: &mut Option<Mounted>,
    changed_rx: &mut Option<watch::Receiver<u64>>,
) -> Result<()> {
    unmount(mounted, changed_rx).await;
    app.session.logout(session_store)?;

    app.todos.clear();
    app.selected = 0;
    app.input.clear();
    app.editing = None;
    app.input_mode = InputMode::Normal;
    app.form.clear();
    app.route = Route::SignIn;
    app.set_status("Signed out".to_string());
    Ok(())
}

/// Initialize logging for TUI mode
///
/// Only initializes if the TICKED_LOG environment variable is set.
/// Logs to {data_dir}/debug.log; stderr would corrupt the display.
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("TICKED_LOG") else {
        return;
    };

    let log_path = config.data_dir.join("debug.log");
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "ticked_core={},ticked_cli={}",
        log_level, log_level
    ));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
