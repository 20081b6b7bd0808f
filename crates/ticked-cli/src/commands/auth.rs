//! Sign-in, sign-up and logout command handlers

use std::io::{self, Write};

use anyhow::{bail, Context, Result};

use ticked_core::{ApiClient, AuthError, Config, SessionStore};

use crate::output::Output;

/// Sign in and persist the session token
pub async fn signin(
    config: &Config,
    session_store: &SessionStore,
    username: Option<String>,
    output: &Output,
) -> Result<()> {
    let username = required("Username", username)?;
    let password = required("Password", None)?;

    let client = ApiClient::new(config);
    match client.sign_in(&username, &password).await {
        Ok(ok) => {
            session_store
                .store_token(&ok.token)
                .context("Failed to store session token")?;
            output.success(&format!("Signed in as {}", ok.user_name));
            Ok(())
        }
        Err(AuthError::InvalidPassword) => bail!("Invalid username or password."),
        Err(e) => bail!("Sign-in failed: {e}"),
    }
}

/// Create an account
///
/// Establishes no session; the flow is sign-up first, then a separate
/// sign-in.
pub async fn signup(config: &Config, username: Option<String>, output: &Output) -> Result<()> {
    let username = required("Username", username)?;
    let password = required("Password", None)?;
    let confirm = required("Confirm password", None)?;

    // Local check first: a mismatch never reaches the network
    validate_passwords(&password, &confirm)?;

    let client = ApiClient::new(config);
    client
        .sign_up(&username, &password)
        .await
        .context("Sign-up failed")?;

    output.success("Account created. Sign in with `ticked signin`.");
    Ok(())
}

/// Clear the stored session token
pub fn logout(session_store: &SessionStore, output: &Output) -> Result<()> {
    session_store
        .clear_token()
        .context("Failed to clear the session token")?;
    output.success("Signed out");
    Ok(())
}

pub(crate) fn validate_passwords(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        bail!("Passwords don't match!");
    }
    Ok(())
}

/// Use the given value or prompt for one; empty input is an error
fn required(label: &str, value: Option<String>) -> Result<String> {
    let value = match value {
        Some(v) => v,
        None => prompt(&format!("{label}: "))?,
    };
    if value.trim().is_empty() {
        bail!("{label} must not be empty.");
    }
    Ok(value.trim().to_string())
}

/// Read one line from stdin, printing the label only on a terminal
fn prompt(label: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        print!("{label}");
        io::stdout().flush()?;
    }
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_passwords() {
        assert!(validate_passwords("secret", "secret").is_ok());

        let err = validate_passwords("secret", "secrte").unwrap_err();
        assert!(err.to_string().contains("don't match"));
    }

    #[test]
    fn test_required_rejects_empty() {
        assert!(required("Username", Some("  ".to_string())).is_err());
        assert_eq!(
            required("Username", Some(" alice ".to_string())).unwrap(),
            "alice"
        );
    }
}
