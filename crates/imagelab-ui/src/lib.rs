#![warn(missing_docs)]
//! # imagelab-ui
//!
//! ## Purpose
//! Defines the UI-facing runtime state model for the ImageLab client.
//!
//! ## Responsibilities
//! - Represent auth, signup, and upload flow statuses as display-safe values.
//! - Project controller phases into banner text with auto-dismiss budgets.
//! - Expose guard checks for which affordances are enabled.
//!
//! ## Data flow
//! Controller transitions are projected into [`UiState`], which drives the
//! rendered shell; a per-second tick retires transient banners.
//!
//! ## Ownership and lifetimes
//! `UiState` owns all string/status values to simplify event reducers.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Invalid
//! combinations are prevented by guard methods.
//!
//! ## Security and privacy notes
//! UI state intentionally excludes secrets: usernames and messages only,
//! never passwords, tokens, or raw image bytes.

use imagelab_auth::{LoginController, LoginPhase};
use imagelab_core::Session;
use imagelab_signup::{SignupController, SignupPhase};
use imagelab_upload::{UploadController, UploadStatus};

/// Ticks a transient banner stays visible before auto-dismissing.
pub const BANNER_TICK_BUDGET: u32 = 5;

/// UI-auth state projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAuthState {
    /// No authenticated session.
    Unauthenticated,
    /// Valid authenticated session.
    Authenticated,
}

/// Visual severity of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Informational notice; auto-dismisses.
    Info,
    /// Success confirmation; auto-dismisses.
    Success,
    /// Failure notice; stays until replaced or cleared.
    Error,
}

/// One transient notice shown at the top of the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Visual severity.
    pub kind: BannerKind,
    /// Display text.
    pub message: String,
    /// Remaining ticks before auto-dismissal; `None` means sticky.
    pub remaining_ticks: Option<u32>,
}

impl Banner {
    /// Creates an auto-dismissing informational banner.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Info,
            message: message.into(),
            remaining_ticks: Some(BANNER_TICK_BUDGET),
        }
    }

    /// Creates an auto-dismissing success banner.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            remaining_ticks: Some(BANNER_TICK_BUDGET),
        }
    }

    /// Creates a sticky error banner.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            remaining_ticks: None,
        }
    }
}

/// Aggregate UI runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Current auth status.
    pub auth: UiAuthState,
    /// Display name of the signed-in user.
    pub username: Option<String>,
    /// Active banner, if any.
    pub banner: Option<Banner>,
    /// Whether the login form must show the final-warning affordance.
    pub final_warning: bool,
    /// Whether the OTP resend affordance is enabled.
    pub resend_enabled: bool,
    /// Whether the upload submit affordance is enabled.
    pub upload_enabled: bool,
    // Last projected (phase, message) snapshots. Banners are raised only on
    // transitions, so re-projecting standing controller state neither
    // re-raises a dismissed banner nor overwrites a newer one.
    last_login: Option<(LoginPhase, Option<String>)>,
    last_signup: Option<(SignupPhase, Option<String>)>,
    last_upload: Option<(UploadStatus, Option<String>)>,
}

impl UiState {
    /// Creates the signed-out default state.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            auth: UiAuthState::Unauthenticated,
            username: None,
            banner: None,
            final_warning: false,
            resend_enabled: false,
            upload_enabled: false,
            last_login: None,
            last_signup: None,
            last_upload: None,
        }
    }

    /// Projects the published session value into the auth fields.
    pub fn apply_session(&mut self, session: &Session) {
        if session.is_authenticated() {
            self.auth = UiAuthState::Authenticated;
            self.username = session.username().map(str::to_string);
        } else {
            self.auth = UiAuthState::Unauthenticated;
            self.username = None;
        }
    }

    /// Projects login controller state into the warning flag and banner.
    ///
    /// Banners are raised only when the controller's phase or message
    /// changed since the last projection.
    pub fn apply_login(&mut self, login: &LoginController) {
        self.final_warning = login.final_warning();

        let snapshot = (login.phase(), login.error_message().map(str::to_string));
        if self.last_login.as_ref() == Some(&snapshot) {
            return;
        }

        if let Some(message) = login.error_message() {
            self.banner = Some(Banner::error(message));
        }
        self.last_login = Some(snapshot);
    }

    /// Projects signup controller state into the resend affordance and banner.
    ///
    /// Banners are raised only on phase or message transitions.
    pub fn apply_signup(&mut self, signup: &SignupController) {
        self.resend_enabled = signup.resend_available();

        let snapshot = (signup.phase(), signup.error_message().map(str::to_string));
        if self.last_signup.as_ref() == Some(&snapshot) {
            return;
        }

        if let Some(message) = signup.error_message() {
            self.banner = Some(Banner::error(message));
        } else if signup.phase() == SignupPhase::Completed {
            self.banner = Some(Banner::success("Account created. You can now sign in."));
        }
        self.last_signup = Some(snapshot);
    }

    /// Projects upload controller state into the submit affordance and banner.
    ///
    /// Banners are raised only on status or message transitions.
    pub fn apply_upload(&mut self, upload: &UploadController) {
        self.upload_enabled =
            self.auth == UiAuthState::Authenticated && upload.status() == UploadStatus::Ready;

        let snapshot = (upload.status(), upload.error_message().map(str::to_string));
        if self.last_upload.as_ref() == Some(&snapshot) {
            return;
        }

        match upload.status() {
            UploadStatus::Succeeded => {
                if let Some(prediction) = upload.prediction() {
                    self.banner =
                        Some(Banner::success(format!("Prediction: {}", prediction.label)));
                }
            }
            UploadStatus::Rejected | UploadStatus::Failed => {
                if let Some(message) = upload.error_message() {
                    self.banner = Some(Banner::error(message));
                }
            }
            _ => {}
        }
        self.last_upload = Some(snapshot);
    }

    /// Advances banner auto-dismissal by one tick.
    pub fn tick_second(&mut self) {
        let expired = match self.banner.as_mut() {
            Some(banner) => match banner.remaining_ticks.as_mut() {
                Some(ticks) => {
                    *ticks = ticks.saturating_sub(1);
                    *ticks == 0
                }
                None => false,
            },
            None => false,
        };

        if expired {
            self.banner = None;
        }
    }

    /// Clears the active banner.
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }
}
