#![warn(missing_docs)]
//! # imagelab-auth
//!
//! ## Purpose
//! Drives credential submission and lockout handling for the ImageLab login
//! flow.
//!
//! ## Responsibilities
//! - Validate credentials locally before any network call.
//! - Interpret the three distinguished login failure shapes: lockout, invalid
//!   credentials with a remaining-attempt count, and everything else.
//! - Hand successful sessions to the session manager.
//!
//! ## Data flow
//! UI submit event -> [`LoginController::submit`] -> transport `/login` ->
//! session manager transition and/or controller phase update -> UI observes
//! [`LoginController::phase`] and [`LoginController::attempt`].
//!
//! ## Ownership and lifetimes
//! The controller owns its phase and attempt state; the session manager is
//! borrowed mutably only for the duration of a submission.
//!
//! ## Error model
//! Every submission terminates in an observable phase. The typed error that
//! produced a terminal phase stays readable via [`LoginController::last_error`];
//! nothing propagates to a global handler.
//!
//! ## Security and privacy notes
//! Passwords are borrowed for the request body only and never stored on the
//! controller.

use imagelab_core::{
    ApiError, AuthFailure, Credential, GENERIC_FAILURE_MESSAGE, LOGIN_ENDPOINT,
};
use imagelab_session::SessionManager;
use imagelab_transport::{ApiClient, AuthAttachment, Method, RequestBody};
use serde_json::{Value, json};

/// Validation message for blank credentials.
pub const BLANK_CREDENTIALS_MESSAGE: &str = "Please enter both username and password";
/// Fallback message for a lockout response without server text.
pub const LOCKED_FALLBACK_MESSAGE: &str =
    "Your account has been temporarily locked due to too many failed attempts.";
/// Fallback message for an invalid-credentials response without server text.
pub const INVALID_CREDENTIALS_FALLBACK_MESSAGE: &str =
    "Login failed. Please check your credentials and try again.";

/// Which credential the deployment carries after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// The login body carries a `token` field held client-side.
    Bearer,
    /// The session credential is a browser-managed cookie.
    Cookie,
}

/// Login controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    /// No submission yet.
    Idle,
    /// A submission is in flight.
    Submitting,
    /// Credentials accepted; the session manager holds the session.
    Success,
    /// Credentials rejected with attempt metadata.
    InvalidCredentials,
    /// Account locked server-side; submission stays disabled until reset.
    Locked,
    /// Validation or other failure.
    Error,
}

/// Transient per-submission attempt state.
///
/// Reset on every new submission and on success. When `locked` is set the
/// remaining-attempt count is meaningless and cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoginAttemptState {
    /// Server-reported attempts left before lockout.
    pub remaining_attempts: Option<u32>,
    /// Whether the account is locked server-side.
    pub locked: bool,
    /// Server-reported lockout remainder in minutes, for display only.
    pub lockout_remaining_minutes: Option<u32>,
}

/// Drives the login state machine.
#[derive(Debug)]
pub struct LoginController {
    mode: CredentialMode,
    phase: LoginPhase,
    attempt: LoginAttemptState,
    error_message: Option<String>,
    last_error: Option<ApiError>,
}

impl LoginController {
    /// Creates an idle controller for the given deployment mode.
    pub fn new(mode: CredentialMode) -> Self {
        Self {
            mode,
            phase: LoginPhase::Idle,
            attempt: LoginAttemptState::default(),
            error_message: None,
            last_error: None,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    /// Returns the current attempt state.
    pub fn attempt(&self) -> &LoginAttemptState {
        &self.attempt
    }

    /// Returns the user-facing message for the last terminal phase.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the typed error behind the last terminal phase.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Returns `true` when a new submission would be accepted.
    ///
    /// Locked is sticky: only [`LoginController::reset`] re-enables
    /// submission, matching the server-authoritative lockout policy.
    pub fn can_submit(&self) -> bool {
        !self.attempt.locked && self.phase != LoginPhase::Submitting
    }

    /// Returns `true` when the UI must show the final-warning affordance.
    pub fn final_warning(&self) -> bool {
        !self.attempt.locked && self.attempt.remaining_attempts == Some(1)
    }

    /// Restores the fresh-mount state.
    pub fn reset(&mut self) {
        self.phase = LoginPhase::Idle;
        self.attempt = LoginAttemptState::default();
        self.error_message = None;
        self.last_error = None;
    }

    /// Submits credentials and drives the machine to a terminal phase.
    ///
    /// Blank input fails locally without any network call. A second call
    /// while a submission is in flight, or while locked, is ignored.
    pub fn submit(
        &mut self,
        client: &ApiClient,
        sessions: &mut SessionManager,
        username: &str,
        password: &str,
    ) {
        if !self.can_submit() {
            return;
        }

        let username = username.trim();
        if username.is_empty() || password.trim().is_empty() {
            self.fail(
                LoginPhase::Error,
                ApiError::Validation(BLANK_CREDENTIALS_MESSAGE.to_string()),
                BLANK_CREDENTIALS_MESSAGE.to_string(),
            );
            return;
        }

        self.phase = LoginPhase::Submitting;
        self.attempt = LoginAttemptState::default();
        self.error_message = None;
        self.last_error = None;

        let result = client.request(
            LOGIN_ENDPOINT,
            Method::Post,
            RequestBody::Json(json!({"username": username, "password": password})),
            AuthAttachment::None,
        );

        match result {
            Ok(body) => self.apply_success(sessions, username, &body),
            Err(error) => self.apply_failure(error),
        }
    }

    fn apply_success(&mut self, sessions: &mut SessionManager, username: &str, body: &Value) {
        let credential = match self.mode {
            CredentialMode::Cookie => Credential::Cookie,
            CredentialMode::Bearer => {
                match body.get("token").and_then(Value::as_str) {
                    Some(token) if !token.trim().is_empty() => {
                        Credential::Bearer(token.to_string())
                    }
                    _ => {
                        let error = ApiError::Contract(
                            "login response is missing the token field".to_string(),
                        );
                        let message = error.to_string();
                        self.fail(LoginPhase::Error, error, message);
                        return;
                    }
                }
            }
        };

        if let Err(error) = sessions.login(username, credential) {
            let message = error.to_string();
            self.fail(
                LoginPhase::Error,
                ApiError::Validation(message.clone()),
                message,
            );
            return;
        }

        self.phase = LoginPhase::Success;
        self.attempt = LoginAttemptState::default();
    }

    fn apply_failure(&mut self, error: ApiError) {
        match &error {
            ApiError::Auth(AuthFailure::Locked {
                lockout_remaining_minutes,
                message,
            }) => {
                self.attempt = LoginAttemptState {
                    remaining_attempts: None,
                    locked: true,
                    lockout_remaining_minutes: *lockout_remaining_minutes,
                };
                let message = message
                    .clone()
                    .unwrap_or_else(|| LOCKED_FALLBACK_MESSAGE.to_string());
                self.fail(LoginPhase::Locked, error, message);
            }
            ApiError::Auth(AuthFailure::InvalidCredentials {
                remaining_attempts,
                message,
            }) => {
                self.attempt = LoginAttemptState {
                    remaining_attempts: *remaining_attempts,
                    locked: false,
                    lockout_remaining_minutes: None,
                };
                let message = message
                    .clone()
                    .unwrap_or_else(|| INVALID_CREDENTIALS_FALLBACK_MESSAGE.to_string());
                self.fail(LoginPhase::InvalidCredentials, error, message);
            }
            ApiError::Http { message, .. } => {
                let message = if message == GENERIC_FAILURE_MESSAGE {
                    INVALID_CREDENTIALS_FALLBACK_MESSAGE.to_string()
                } else {
                    message.clone()
                };
                self.fail(LoginPhase::Error, error, message);
            }
            _ => {
                let message = "Login failed. Please try again.".to_string();
                self.fail(LoginPhase::Error, error, message);
            }
        }
    }

    fn fail(&mut self, phase: LoginPhase, error: ApiError, message: String) {
        self.phase = phase;
        self.error_message = Some(message);
        self.last_error = Some(error);
    }
}
