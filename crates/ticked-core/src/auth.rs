//! Account API client
//!
//! Sign-in and sign-up against the remote account API. Every call
//! produces an explicit result; nothing fails silently. Classification of
//! responses is kept in pure functions so the policy is testable without
//! a network.
//!
//! The backend reports a wrong password as a 200-range response whose
//! body carries the literal message "invalid password"; that exact string
//! is the detection contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Backend message sent for a wrong password
const INVALID_PASSWORD_MESSAGE: &str = "invalid password";

/// Errors from the account API
#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend rejected the password
    #[error("Invalid username or password")]
    InvalidPassword,

    /// The backend rejected the request
    #[error("The account API rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A success response without the fields the client needs
    #[error("Malformed response from the account API: {0}")]
    MalformedResponse(String),

    /// The request never completed
    #[error("Could not reach the account API: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A successful sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOk {
    pub user_name: String,
    pub token: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// The fields the backend may put in a response body
#[derive(Debug, Default, Deserialize)]
struct ApiBody {
    token: Option<String>,
    message: Option<String>,
    username: Option<String>,
}

/// Client for the account API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sign in with username and password
    ///
    /// On success the caller persists the returned token and establishes
    /// the session; this client performs no side effects.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SignInOk, AuthError> {
        debug!(username, "signing in");
        let response = self
            .http
            .post(format!("{}/signin", self.base_url))
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        classify_sign_in(username, status, &body)
    }

    /// Create an account
    ///
    /// Success establishes no session: the account flow is sign-up first,
    /// then a separate sign-in.
    pub async fn sign_up(&self, username: &str, password: &str) -> Result<(), AuthError> {
        debug!(username, "signing up");
        let response = self
            .http
            .post(format!("{}/user", self.base_url))
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        classify_sign_up(status, &body)
    }
}

/// Decide what a sign-in response means
fn classify_sign_in(username: &str, status: u16, body: &str) -> Result<SignInOk, AuthError> {
    let parsed: ApiBody = serde_json::from_str(body).unwrap_or_default();

    if parsed.message.as_deref() == Some(INVALID_PASSWORD_MESSAGE) {
        return Err(AuthError::InvalidPassword);
    }

    if !(200..300).contains(&status) {
        warn!(status, "sign-in rejected");
        return Err(AuthError::Rejected {
            status,
            message: rejection_message(&parsed, body),
        });
    }

    let Some(token) = parsed.token.filter(|t| !t.is_empty() && t != "undefined") else {
        return Err(AuthError::MalformedResponse(
            "success response carried no token".to_string(),
        ));
    };

    Ok(SignInOk {
        user_name: parsed.username.unwrap_or_else(|| username.to_string()),
        token,
    })
}

/// Decide what a sign-up response means
fn classify_sign_up(status: u16, body: &str) -> Result<(), AuthError> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    warn!(status, "sign-up rejected");
    let parsed: ApiBody = serde_json::from_str(body).unwrap_or_default();
    Err(AuthError::Rejected {
        status,
        message: rejection_message(&parsed, body),
    })
}

fn rejection_message(parsed: &ApiBody, body: &str) -> String {
    match &parsed.message {
        Some(message) => message.clone(),
        None => {
            let snippet: String = body.chars().take(120).collect();
            snippet
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_success() {
        let ok = classify_sign_in("alice", 200, r#"{"token": "tok-123"}"#).unwrap();
        assert_eq!(ok.token, "tok-123");
        // Username falls back to the submitted one
        assert_eq!(ok.user_name, "alice");
    }

    #[test]
    fn test_sign_in_uses_backend_username() {
        let ok = classify_sign_in(
            "alice",
            200,
            r#"{"token": "tok-123", "username": "Alice"}"#,
        )
        .unwrap();
        assert_eq!(ok.user_name, "Alice");
    }

    #[test]
    fn test_invalid_password_detected_exactly() {
        // The backend sends this message with a success status
        let err = classify_sign_in("alice", 200, r#"{"message": "invalid password"}"#).unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));

        // Any other message on a success status is a malformed success
        let err =
            classify_sign_in("alice", 200, r#"{"message": "Invalid Password"}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_sign_in_rejection_surfaces_status_and_message() {
        let err =
            classify_sign_in("alice", 404, r#"{"message": "no such user"}"#).unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such user");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sign_in_success_without_token_is_malformed() {
        let err = classify_sign_in("alice", 200, r#"{"welcome": true}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));

        // A literal "undefined" token must never establish a session
        let err = classify_sign_in("alice", 200, r#"{"token": "undefined"}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_sign_in_non_json_rejection() {
        let err = classify_sign_in("alice", 502, "Bad Gateway").unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sign_up_success_and_rejection() {
        assert!(classify_sign_up(201, r#"{"id": 7}"#).is_ok());

        let err = classify_sign_up(409, r#"{"message": "username taken"}"#).unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "username taken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
