#![warn(missing_docs)]
//! # imagelab-app
//!
//! ## Purpose
//! Orchestrates session, login, signup, and upload state for the ImageLab
//! client.
//!
//! ## Responsibilities
//! - Own the single application context passed into controllers.
//! - Load deployment configuration from the environment.
//! - Fan the per-second tick out to countdown and banner owners.
//! - Provide transport security checks and log redaction helpers.
//!
//! ## Data flow
//! UI events mutate controllers through [`AppContext`]; after each event the
//! context re-projects session and controller state into the UI model.
//!
//! ## Ownership and lifetimes
//! The context owns every controller and the session manager. Nothing else
//! holds mutable session state, so all writes flow through one place.
//!
//! ## Error model
//! Context construction failures are wrapped in [`AppError`]; controller
//! failures terminate in their own observable phases and never propagate out.
//!
//! ## Security and privacy notes
//! - Log redaction helpers strip password/token strings before they reach
//!   the run log.
//! - The endpoint security check flags non-HTTPS deployments.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use imagelab_auth::{CredentialMode, LoginController};
use imagelab_core::ApiError;
use imagelab_session::{SessionError, SessionManager, SessionStore};
use imagelab_signup::SignupController;
use imagelab_transport::{ApiClient, HttpTransport};
use imagelab_ui::UiState;
use imagelab_upload::{DEFAULT_MAX_UPLOAD_BYTES, RetryPolicy, UploadConfig, UploadController};
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("IMAGELAB_VERSION");

/// Default backend base URL when `IMAGELAB_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "https://api.imagelab.test";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Deployment configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_base_url: String,
    /// How the deployment carries the session credential.
    pub credential_mode: CredentialMode,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            credential_mode: CredentialMode::Bearer,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the environment.
    ///
    /// Knobs:
    /// - `IMAGELAB_API_URL` overrides the backend base URL.
    /// - `IMAGELAB_CREDENTIAL_MODE=cookie` selects cookie mode; any other
    ///   value (or unset) selects bearer mode.
    /// - `IMAGELAB_MAX_UPLOAD_BYTES` overrides the upload ceiling; invalid
    ///   or zero values fall back to the default.
    pub fn from_env() -> Self {
        let api_base_url =
            std::env::var("IMAGELAB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let credential_mode = match std::env::var("IMAGELAB_CREDENTIAL_MODE") {
            Ok(value) if value.trim().eq_ignore_ascii_case("cookie") => CredentialMode::Cookie,
            _ => CredentialMode::Bearer,
        };

        let max_upload_bytes = std::env::var("IMAGELAB_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|bytes| *bytes > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            api_base_url,
            credential_mode,
            max_upload_bytes,
        }
    }
}

/// The single owned context all controllers hang off.
pub struct AppContext {
    /// Resolved deployment configuration.
    pub config: AppConfig,
    /// Request client shared by every controller.
    pub client: ApiClient,
    /// Session state machine.
    pub sessions: SessionManager,
    /// Login flow controller.
    pub login: LoginController,
    /// Signup/OTP flow controller.
    pub signup: SignupController,
    /// Upload pipeline controller.
    pub upload: UploadController,
    /// Display-safe UI projection.
    pub ui: UiState,
}

impl AppContext {
    /// Builds the context, performing the single session rehydration pass.
    ///
    /// # Errors
    /// Returns [`AppError::Api`] when the configured base URL is rejected.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, AppError> {
        let client = ApiClient::new(config.api_base_url.clone(), transport)?;
        let sessions = SessionManager::initialize(store);
        let upload = UploadController::new(UploadConfig {
            max_upload_bytes: config.max_upload_bytes,
            retry: RetryPolicy::default(),
        });

        let mut context = Self {
            login: LoginController::new(config.credential_mode),
            signup: SignupController::new(),
            upload,
            ui: UiState::new(app_version()),
            config,
            client,
            sessions,
        };
        context.refresh_ui();
        Ok(context)
    }

    /// Submits login credentials and re-projects UI state.
    pub fn submit_login(&mut self, username: &str, password: &str) {
        self.login
            .submit(&self.client, &mut self.sessions, username, password);
        self.refresh_ui();
    }

    /// Requests server-confirmed logout.
    ///
    /// On success the login and upload controllers return to their fresh
    /// state; on failure the session is left untouched.
    ///
    /// # Errors
    /// Propagates [`SessionError`] from the confirmation call or the store.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.sessions.logout(&self.client)?;
        self.login.reset();
        self.upload.reset();
        self.refresh_ui();
        Ok(())
    }

    /// Forwards the per-second tick to countdown and banner owners.
    pub fn tick_second(&mut self) {
        self.signup.tick_second();
        self.ui.tick_second();
        self.ui.resend_enabled = self.signup.resend_available();
    }

    /// Re-projects session and controller state into the UI model.
    pub fn refresh_ui(&mut self) {
        self.ui.apply_session(self.sessions.session());
        self.ui.apply_login(&self.login);
        self.ui.apply_signup(&self.signup);
        self.ui.apply_upload(&self.upload);
    }
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

/// Redacts common secret markers in log-safe output.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in ["password", "token", "authorization", "bearer"] {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    if let Some(position) = lower.find(key) {
        let prefix = &input[..position];
        return format!("{prefix}{key}=<redacted>");
    }

    input.to_string()
}

/// Per-run append-only file logger.
///
/// One file per process run, named by UTC start timestamp. Lines are
/// pipe-delimited: timestamp, level, stage, action, detail.
pub struct RunLogger {
    file: Mutex<File>,
    path: PathBuf,
}

impl RunLogger {
    /// Creates the run log file inside the given directory.
    ///
    /// # Errors
    /// Returns [`AppError::Logger`] when the file cannot be created.
    pub fn create_in(directory: &Path) -> Result<Self, AppError> {
        let timestamp = timestamp_compact_utc();
        let path = directory.join(format!("{timestamp}_log.txt"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|error| {
                AppError::Logger(format!(
                    "unable to create log file '{}': {error}",
                    path.display()
                ))
            })?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one structured line; errors flush immediately.
    pub fn write_line(&self, level: &str, stage: &str, action: &str, detail: &str) {
        let timestamp = timestamp_compact_utc();
        let line = format!("{timestamp} | {level} | {stage} | {action} | {detail}\n");

        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            if level == "ERROR" {
                let _ = file.flush();
            }
        }
    }
}

/// Compact UTC timestamp used for log files and lines.
pub fn timestamp_compact_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Transport or configuration rejection.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    /// Session lifecycle error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    /// Run logger setup failure.
    #[error("logger error: {0}")]
    Logger(String),
}
