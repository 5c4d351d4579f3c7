#![warn(missing_docs)]
//! # imagelab-core
//!
//! ## Purpose
//! Defines the shared data model used across the `imagelab` client workspace.
//!
//! ## Responsibilities
//! - Represent the session value owned by the session manager.
//! - Name the backend endpoints consumed by controllers.
//! - Define the client error taxonomy.
//! - Classify non-success backend responses exactly once per response.
//!
//! ## Data flow
//! Transport receives a raw status/body pair -> [`classify_failure`] derives a
//! typed [`ApiError`] -> controllers match on variant tags instead of sniffing
//! JSON keys at each call site.
//!
//! ## Ownership and lifetimes
//! Session and error values own their strings (`String`) so controllers and
//! stores never borrow from transient response buffers.
//!
//! ## Error model
//! [`ApiError`] is the single taxonomy for the whole client: local validation,
//! structured auth failures, other HTTP failures, transport failures, and
//! contract violations on successful statuses.
//!
//! ## Security and privacy notes
//! This crate never logs credential or token values. Tokens are opaque.
//!
//! ## Example
//! ```rust
//! use imagelab_core::{Credential, Session};
//!
//! let session = Session::authenticated("ada", Credential::Cookie);
//! assert!(session.is_authenticated());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Login endpoint path.
pub const LOGIN_ENDPOINT: &str = "/login";
/// Signup (final account creation) endpoint path.
pub const SIGNUP_ENDPOINT: &str = "/signup";
/// OTP request endpoint path.
pub const SEND_OTP_ENDPOINT: &str = "/send-otp";
/// OTP verification endpoint path.
pub const VERIFY_OTP_ENDPOINT: &str = "/verify-otp";
/// Image prediction endpoint path.
pub const PREDICT_ENDPOINT: &str = "/predict";
/// Server-confirmed logout endpoint path.
pub const LOGOUT_ENDPOINT: &str = "/logout";
/// Session probe endpoint path.
pub const ME_ENDPOINT: &str = "/me";

/// Session credential, covering both deployment modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    /// Opaque bearer token attached by transport on authenticated calls.
    Bearer(String),
    /// Browser-managed cookie; the client never holds the token itself.
    Cookie,
}

impl Credential {
    /// Returns the bearer token when one is held client-side.
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credential::Bearer(token) => Some(token.as_str()),
            Credential::Cookie => None,
        }
    }
}

/// The client's belief about whether the user is authenticated and as whom.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    username: Option<String>,
    credential: Option<Credential>,
}

impl Session {
    /// Creates the empty anonymous session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates an authenticated session value.
    ///
    /// Blank usernames and empty bearer tokens produce an anonymous session
    /// instead, preserving the authenticated-iff-complete invariant.
    pub fn authenticated(username: impl Into<String>, credential: Credential) -> Self {
        let username = username.into();
        if username.trim().is_empty() {
            return Self::anonymous();
        }
        if let Credential::Bearer(token) = &credential
            && token.trim().is_empty()
        {
            return Self::anonymous();
        }

        Self {
            username: Some(username),
            credential: Some(credential),
        }
    }

    /// Returns `true` when both username and credential are present.
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.credential.is_some()
    }

    /// Returns the authenticated username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the held credential, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Returns the bearer token when the session holds one client-side.
    pub fn bearer_token(&self) -> Option<&str> {
        self.credential.as_ref().and_then(Credential::bearer_token)
    }
}

/// Structured 401/403 auth failure carrying server-reported metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Invalid credentials with a server-reported remaining-attempt count.
    InvalidCredentials {
        /// Attempts left before lockout, when the server reports one.
        remaining_attempts: Option<u32>,
        /// Server-provided message, when present.
        message: Option<String>,
    },
    /// Account is locked server-side.
    Locked {
        /// Server-reported lockout remainder in minutes, when present.
        lockout_remaining_minutes: Option<u32>,
        /// Server-provided message, when present.
        message: Option<String>,
    },
}

impl AuthFailure {
    /// Returns the server-provided message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            AuthFailure::InvalidCredentials { message, .. }
            | AuthFailure::Locked { message, .. } => message.as_deref(),
        }
    }
}

/// Client error taxonomy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Local pre-network validation failure; never contacts the backend.
    #[error("{0}")]
    Validation(String),
    /// Structured 401/403 response with attempt/lockout metadata.
    #[error("authentication failed")]
    Auth(AuthFailure),
    /// Other non-2xx response with an optional backend message.
    #[error("http {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Backend-provided or generic message.
        message: String,
    },
    /// The request could not complete (DNS/connection failure, abort).
    #[error("network failure: {0}")]
    Network(String),
    /// A 2xx response whose payload misses an expected field.
    #[error("contract violation: {0}")]
    Contract(String),
}

/// Generic message used when a failure body carries no usable text.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred";

/// Classifies one non-success response into the taxonomy.
///
/// The body is inspected exactly once here; callers downstream match on
/// variant tags only. Backend failure bodies carry their text under either
/// `message` or `error` depending on the route.
pub fn classify_failure(status: u16, body: &Value) -> ApiError {
    let message = failure_message(body);

    if status == 403 && body.get("locked").and_then(Value::as_bool) == Some(true) {
        return ApiError::Auth(AuthFailure::Locked {
            lockout_remaining_minutes: read_u32(body, "lockout_remaining"),
            message,
        });
    }

    if status == 401 && body.get("remaining_attempts").is_some() {
        return ApiError::Auth(AuthFailure::InvalidCredentials {
            remaining_attempts: read_u32(body, "remaining_attempts"),
            message,
        });
    }

    ApiError::Http {
        status,
        message: message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
    }
}

fn failure_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn read_u32(body: &Value, key: &str) -> Option<u32> {
    body.get(key)
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    //! Unit tests for session invariants and failure classification.

    use serde_json::json;

    use super::*;

    #[test]
    fn session_requires_username_and_credential() {
        assert!(!Session::anonymous().is_authenticated());
        assert!(!Session::authenticated("  ", Credential::Cookie).is_authenticated());
        assert!(
            !Session::authenticated("ada", Credential::Bearer(String::new())).is_authenticated()
        );
        assert!(Session::authenticated("ada", Credential::Cookie).is_authenticated());
    }

    #[test]
    fn locked_response_classifies_with_lockout_metadata() {
        let body = json!({"locked": true, "lockout_remaining": 15, "message": "Account locked"});
        let error = classify_failure(403, &body);
        assert_eq!(
            error,
            ApiError::Auth(AuthFailure::Locked {
                lockout_remaining_minutes: Some(15),
                message: Some("Account locked".to_string()),
            })
        );
    }

    #[test]
    fn remaining_attempts_response_classifies_as_invalid_credentials() {
        let body = json!({"remaining_attempts": 1, "message": "Invalid password"});
        let error = classify_failure(401, &body);
        assert_eq!(
            error,
            ApiError::Auth(AuthFailure::InvalidCredentials {
                remaining_attempts: Some(1),
                message: Some("Invalid password".to_string()),
            })
        );
    }

    #[test]
    fn other_failures_fall_back_to_http_with_generic_message() {
        let error = classify_failure(500, &json!({}));
        assert_eq!(
            error,
            ApiError::Http {
                status: 500,
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            }
        );

        let error = classify_failure(409, &json!({"error": "User already exists"}));
        assert_eq!(
            error,
            ApiError::Http {
                status: 409,
                message: "User already exists".to_string(),
            }
        );
    }
}
