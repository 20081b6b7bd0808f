//! Ticked CLI
//!
//! Command-line interface for Ticked - local-first todo list with
//! account sync.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ticked_core::sync::SyncClient;
use ticked_core::{Config, SessionStore, Store};

mod commands;
mod output;
mod tui;

use output::{Output, OutputFormat};

/// Replica name for the single-account client
const REPLICA_NAME: &str = "todo-user";

#[derive(Parser)]
#[command(name = "ticked")]
#[command(about = "Ticked - local-first todo list with account sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// Sign in and store the session token
    Signin {
        /// Account username (prompted when omitted)
        username: Option<String>,
    },
    /// Create an account (sign in separately afterwards)
    Signup {
        /// Account username (prompted when omitted)
        username: Option<String>,
    },
    /// Clear the stored session token
    Logout,
    /// Add a todo
    Add {
        /// Todo text
        title: String,
        /// Sort position (defaults to the end of the list)
        #[arg(long)]
        order: Option<f64>,
    },
    /// List todos
    #[command(alias = "ls")]
    List,
    /// Toggle a todo's completion flag
    Toggle {
        /// Todo id (full or prefix)
        id: String,
    },
    /// Change a todo's text
    Edit {
        /// Todo id (full or prefix)
        id: String,
        /// New text
        title: String,
    },
    /// Delete a todo
    #[command(alias = "rm")]
    Delete {
        /// Todo id (full or prefix)
        id: String,
    },
    /// Reconcile with the backend now
    Sync,
    /// Show session and replica status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, license_key, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need anything else
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    // TUI (default when no command given) owns its own setup and logging
    if matches!(&cli.command, Some(Commands::Tui) | None) {
        return tui::run().await;
    }

    let config = Config::load()?;
    init_cli_logging(&config);

    let session_store = SessionStore::new(&config);

    // Auth commands operate without a store binding
    match &cli.command {
        Some(Commands::Signin { username }) => {
            return commands::auth::signin(&config, &session_store, username.clone(), &output)
                .await;
        }
        Some(Commands::Signup { username }) => {
            return commands::auth::signup(&config, username.clone(), &output).await;
        }
        Some(Commands::Logout) => {
            return commands::auth::logout(&session_store, &output);
        }
        _ => {}
    }

    // Everything below is protected: a stored token is required. Presence
    // alone gates access; validity is the backend's call.
    let Some(token) = session_store.token() else {
        bail!("Not signed in. Run `ticked signin` first.");
    };

    let store = Store::open(config, REPLICA_NAME, &token)?;

    let is_write = matches!(
        &cli.command,
        Some(Commands::Add { .. })
            | Some(Commands::Toggle { .. })
            | Some(Commands::Edit { .. })
            | Some(Commands::Delete { .. })
    );
    let is_manual_sync = matches!(&cli.command, Some(Commands::Sync));

    // Sync before read commands (to get latest data)
    if !is_write && !is_manual_sync {
        auto_sync(&store, &output).await;
    }

    let result = match cli.command.unwrap() {
        Commands::Tui
        | Commands::Signin { .. }
        | Commands::Signup { .. }
        | Commands::Logout
        | Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Add { title, order } => commands::todo::add(&store, title, order, &output),
        Commands::List => commands::todo::list(&store, &output),
        Commands::Toggle { id } => commands::todo::toggle(&store, &id, &output),
        Commands::Edit { id, title } => commands::todo::edit(&store, &id, title, &output),
        Commands::Delete { id } => commands::todo::delete(&store, &id, &output),
        Commands::Sync => commands::sync::sync(&store, &output).await,
        Commands::Status => commands::status::show(&store, &session_store, &output),
    };

    // Sync after write commands (to push changes)
    if is_write {
        auto_sync(&store, &output).await;
    }

    result
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Reconcile around a command, surfacing failures as warnings
async fn auto_sync(store: &Store, output: &Output) {
    let client = SyncClient::new(store.config(), store.auth_token());
    if let Err(e) = client.sync_once(&store.shared()).await {
        if !output.is_quiet() {
            eprintln!("⚠ Auto-sync failed: {}", e);
        }
    }
}

/// Initialize logging for CLI commands
///
/// Logs to stderr; TICKED_LOG overrides the configured log level.
fn init_cli_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("TICKED_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
