//! Status command handler

use anyhow::Result;

use ticked_core::{SessionStore, Store};

use crate::output::{Output, OutputFormat};

/// Show session and replica status
pub fn show(store: &Store, session_store: &SessionStore, output: &Output) -> Result<()> {
    let config = store.config();
    let signed_in = session_store.token().is_some();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "signed_in": signed_in,
                    "replica": store.name(),
                    "api_url": config.api_url,
                    "push_url": config.push_url(),
                    "pull_url": config.pull_url(),
                    "counts": {
                        "todos": store.todo_count(),
                        "pending_mutations": store.pending_count()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.todo_count());
        }
        OutputFormat::Human => {
            println!("Ticked Status");
            println!("=============");
            println!();
            println!("Session:");
            println!(
                "  Status: {}",
                if signed_in { "signed in" } else { "signed out" }
            );
            println!();
            println!("Sync:");
            println!("  Push: {}", config.push_url());
            println!("  Pull: {}", config.pull_url());
            println!();
            println!("Storage:");
            println!("  Replica:  {}", store.name());
            println!("  Location: {}", config.data_dir.display());
            println!();
            println!("Contents:");
            println!("  Todos:   {}", store.todo_count());
            println!("  Pending: {}", store.pending_count());
        }
    }

    Ok(())
}
