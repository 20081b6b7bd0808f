//! Config command handlers

use anyhow::{bail, Context, Result};

use ticked_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "push_url": config.push_url,
                    "pull_url": config.pull_url,
                    "license_key": config.license_key.as_deref().map(|_| "(set)"),
                    "sync_interval_secs": config.sync_interval_secs,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:           {}", config.data_dir.display());
            println!("  api_url:            {}", config.api_url);
            println!(
                "  push_url:           {}",
                config.push_url.as_deref().unwrap_or("(derived from api_url)")
            );
            println!(
                "  pull_url:           {}",
                config.pull_url.as_deref().unwrap_or("(derived from api_url)")
            );
            println!(
                "  license_key:        {}",
                if config.license_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  sync_interval_secs: {}", config.sync_interval_secs);
            println!("  log_level:          {}", config.log_level);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "api_url" => {
            config.api_url = value.clone();
        }
        "push_url" => {
            config.push_url = optional(&value);
        }
        "pull_url" => {
            config.pull_url = optional(&value);
        }
        "license_key" => {
            config.license_key = optional(&value);
        }
        "sync_interval_secs" => {
            config.sync_interval_secs = value
                .parse()
                .context("Invalid value for sync_interval_secs. Use a number of seconds.")?;
        }
        "log_level" => {
            config.log_level = value.clone();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, push_url, pull_url, license_key, \
                 sync_interval_secs, log_level",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}
