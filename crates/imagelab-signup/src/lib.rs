#![warn(missing_docs)]
//! # imagelab-signup
//!
//! ## Purpose
//! Drives the two-phase account creation flow gated by a time-boxed one-time
//! passcode.
//!
//! ## Responsibilities
//! - Validate signup details locally, fail-fast, before any network call.
//! - Request and re-request OTPs, tracking a presentational expiry countdown.
//! - Verify the entered code and finalize account creation in one step.
//! - Map duplicate-username backend messages to friendlier text.
//!
//! ## Data flow
//! Details submit -> `/send-otp` -> code entry + per-second ticks ->
//! [`SignupController::verify`] -> `/verify-otp` then `/signup` ->
//! `Completed`.
//!
//! ## Ownership and lifetimes
//! The controller owns entered details and the OTP session so failed steps
//! return to their originating phase without losing user input.
//!
//! ## Error model
//! Every step terminates in an observable phase with a user-facing message;
//! the typed error stays readable via [`SignupController::last_error`].
//!
//! ## Security and privacy notes
//! The countdown is presentational only; OTP expiry is enforced server-side.
//! Passwords never leave the controller except inside request bodies.

use imagelab_core::{ApiError, SEND_OTP_ENDPOINT, SIGNUP_ENDPOINT, VERIFY_OTP_ENDPOINT};
use imagelab_transport::{ApiClient, AuthAttachment, Method, RequestBody};
use serde_json::json;

/// OTP countdown start value in seconds.
pub const OTP_EXPIRY_SECONDS: u32 = 60;

/// Validation message for a blank username.
pub const USERNAME_REQUIRED_MESSAGE: &str = "Username is required";
/// Validation message for a blank password.
pub const PASSWORD_REQUIRED_MESSAGE: &str = "Password is required";
/// Validation message for a confirmation mismatch.
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match";
/// Validation message for a short password.
pub const PASSWORD_LENGTH_MESSAGE: &str = "Password must be at least 6 characters long";
/// Validation message for the letter-and-digit pattern.
pub const PASSWORD_PATTERN_MESSAGE: &str =
    "Password must contain at least one letter and one number";
/// Validation message for a missing OTP code.
pub const OTP_CODE_REQUIRED_MESSAGE: &str = "Please enter the code that was sent to you";

/// Signup flow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupPhase {
    /// Collecting username/password/confirmation.
    CollectingDetails,
    /// OTP request in flight.
    SendingOtp,
    /// Waiting for the user to enter the emailed code.
    AwaitingOtp,
    /// Code verification (and final account creation) in flight.
    VerifyingOtp,
    /// Account created.
    Completed,
}

/// Entered account details, retained across failed steps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignupDetails {
    /// Chosen username.
    pub username: String,
    /// Chosen password.
    pub password: String,
    /// Password confirmation.
    pub confirm_password: String,
}

/// Active OTP exchange state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSession {
    /// Username the code was requested for.
    pub username: String,
    /// Code entered by the user so far.
    pub code: String,
    /// Presentational countdown; never goes below zero.
    pub expires_in_seconds: u32,
}

/// Runs the fail-fast local validation chain.
///
/// Checks run in a fixed order and stop at the first failure: blank
/// username, blank password, confirmation mismatch, length, then the
/// letter-and-digit pattern.
///
/// # Errors
/// Returns [`ApiError::Validation`] carrying the distinct message of the
/// first failing check.
pub fn validate_details(details: &SignupDetails) -> Result<(), ApiError> {
    if details.username.trim().is_empty() {
        return Err(ApiError::Validation(USERNAME_REQUIRED_MESSAGE.to_string()));
    }
    if details.password.trim().is_empty() {
        return Err(ApiError::Validation(PASSWORD_REQUIRED_MESSAGE.to_string()));
    }
    if details.password != details.confirm_password {
        return Err(ApiError::Validation(PASSWORD_MISMATCH_MESSAGE.to_string()));
    }
    if details.password.chars().count() < 6 {
        return Err(ApiError::Validation(PASSWORD_LENGTH_MESSAGE.to_string()));
    }

    let has_letter = details.password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = details.password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ApiError::Validation(PASSWORD_PATTERN_MESSAGE.to_string()));
    }

    Ok(())
}

/// Maps known duplicate-username backend messages to friendlier text.
///
/// Unmatched messages pass through verbatim.
pub fn friendly_signup_message(raw: &str) -> String {
    if raw.contains("Username already taken") {
        return "Username already taken. Please choose another one.".to_string();
    }
    if raw.contains("User already exists") {
        return "This username is already registered. Please try a different one.".to_string();
    }
    raw.to_string()
}

/// Drives the two-phase signup state machine.
#[derive(Debug)]
pub struct SignupController {
    phase: SignupPhase,
    details: SignupDetails,
    otp: Option<OtpSession>,
    error_message: Option<String>,
    last_error: Option<ApiError>,
}

impl SignupController {
    /// Creates a controller in the collecting phase.
    pub fn new() -> Self {
        Self {
            phase: SignupPhase::CollectingDetails,
            details: SignupDetails::default(),
            otp: None,
            error_message: None,
            last_error: None,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SignupPhase {
        self.phase
    }

    /// Returns the retained signup details.
    pub fn details(&self) -> &SignupDetails {
        &self.details
    }

    /// Returns the active OTP session, if any.
    pub fn otp(&self) -> Option<&OtpSession> {
        self.otp.as_ref()
    }

    /// Returns the user-facing message for the last failed step.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the typed error behind the last failed step.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Returns `true` once the countdown reached zero and the resend
    /// affordance should be enabled.
    pub fn resend_available(&self) -> bool {
        self.phase == SignupPhase::AwaitingOtp
            && self
                .otp
                .as_ref()
                .is_some_and(|otp| otp.expires_in_seconds == 0)
    }

    /// Validates entered details and requests an OTP for the username.
    ///
    /// On validation or backend failure the controller returns to
    /// `CollectingDetails` with the entered data intact.
    pub fn submit_details(&mut self, client: &ApiClient, details: SignupDetails) {
        if self.phase != SignupPhase::CollectingDetails {
            return;
        }

        self.details = details;
        self.error_message = None;
        self.last_error = None;

        if let Err(error) = validate_details(&self.details) {
            self.fail(SignupPhase::CollectingDetails, error);
            return;
        }

        self.phase = SignupPhase::SendingOtp;
        let result = client.request(
            SEND_OTP_ENDPOINT,
            Method::Post,
            RequestBody::Json(json!({"username": self.details.username.trim()})),
            AuthAttachment::None,
        );

        match result {
            Ok(_) => {
                self.otp = Some(OtpSession {
                    username: self.details.username.trim().to_string(),
                    code: String::new(),
                    expires_in_seconds: OTP_EXPIRY_SECONDS,
                });
                self.phase = SignupPhase::AwaitingOtp;
            }
            Err(error) => self.fail(SignupPhase::CollectingDetails, error),
        }
    }

    /// Advances the presentational countdown by one second.
    ///
    /// Only ticks while awaiting a code and never goes below zero; reaching
    /// zero flips the resend affordance and nothing else.
    pub fn tick_second(&mut self) {
        if self.phase != SignupPhase::AwaitingOtp {
            return;
        }
        if let Some(otp) = self.otp.as_mut() {
            otp.expires_in_seconds = otp.expires_in_seconds.saturating_sub(1);
        }
    }

    /// Records the code the user entered so far.
    pub fn set_code(&mut self, code: impl Into<String>) {
        if let Some(otp) = self.otp.as_mut() {
            otp.code = code.into();
        }
    }

    /// Re-requests a code for the same username and restarts the countdown.
    pub fn resend(&mut self, client: &ApiClient) {
        if self.phase != SignupPhase::AwaitingOtp {
            return;
        }
        let Some(username) = self.otp.as_ref().map(|otp| otp.username.clone()) else {
            return;
        };

        let result = client.request(
            SEND_OTP_ENDPOINT,
            Method::Post,
            RequestBody::Json(json!({"username": username})),
            AuthAttachment::None,
        );

        match result {
            Ok(_) => {
                if let Some(otp) = self.otp.as_mut() {
                    otp.code.clear();
                    otp.expires_in_seconds = OTP_EXPIRY_SECONDS;
                }
                self.error_message = None;
                self.last_error = None;
            }
            Err(error) => self.fail(SignupPhase::AwaitingOtp, error),
        }
    }

    /// Verifies the entered code and finalizes account creation.
    ///
    /// OTP rejection and account-creation failure both return to
    /// `AwaitingOtp` so the user does not need to re-request a code.
    pub fn verify(&mut self, client: &ApiClient) {
        if self.phase != SignupPhase::AwaitingOtp {
            return;
        }
        let Some(otp) = self.otp.clone() else {
            return;
        };

        if otp.code.trim().is_empty() {
            self.fail(
                SignupPhase::AwaitingOtp,
                ApiError::Validation(OTP_CODE_REQUIRED_MESSAGE.to_string()),
            );
            return;
        }

        self.phase = SignupPhase::VerifyingOtp;
        self.error_message = None;
        self.last_error = None;

        let verified = client.request(
            VERIFY_OTP_ENDPOINT,
            Method::Post,
            RequestBody::Json(json!({"username": otp.username, "otp": otp.code.trim()})),
            AuthAttachment::None,
        );
        if let Err(error) = verified {
            self.fail(SignupPhase::AwaitingOtp, error);
            return;
        }

        let created = client.request(
            SIGNUP_ENDPOINT,
            Method::Post,
            RequestBody::Json(json!({
                "username": self.details.username.trim(),
                "password": self.details.password,
            })),
            AuthAttachment::None,
        );
        if let Err(error) = created {
            self.fail(SignupPhase::AwaitingOtp, error);
            return;
        }

        self.otp = None;
        self.phase = SignupPhase::Completed;
    }

    fn fail(&mut self, return_phase: SignupPhase, error: ApiError) {
        let message = match &error {
            ApiError::Validation(message) => message.clone(),
            ApiError::Http { message, .. } => friendly_signup_message(message),
            other => other.to_string(),
        };

        self.phase = return_phase;
        self.error_message = Some(message);
        self.last_error = Some(error);
    }
}

impl Default for SignupController {
    fn default() -> Self {
        Self::new()
    }
}
