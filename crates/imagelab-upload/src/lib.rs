#![warn(missing_docs)]
//! # imagelab-upload
//!
//! ## Purpose
//! Drives the image selection, preview, and classification pipeline.
//!
//! ## Responsibilities
//! - Validate selected files locally (MIME type, then size) before any
//!   network activity.
//! - Maintain an inline base64 preview decoupled from validation outcome.
//! - Submit accepted images as multipart form data to the classify route,
//!   retrying transient failures with jittered backoff.
//! - Enforce the classification response contract: a missing or empty
//!   predicted-class field is a failure, whatever the status code said.
//!
//! ## Data flow
//! File pick -> [`UploadController::select_file`] -> `Ready` with preview ->
//! [`UploadController::upload`] -> `/predict` -> `Succeeded` with a
//! [`Prediction`], or a terminal `Failed`/`Rejected` with a message.
//!
//! ## Ownership and lifetimes
//! The controller owns the selected bytes and preview; callers observe state
//! through shared references only.
//!
//! ## Error model
//! Local rejections never leave the controller. Backend failures are
//! classified into retriable and permanent classes; only retriable ones
//! consume retry budget.
//!
//! ## Security and privacy notes
//! Image bytes stay in memory and are sent only to the configured classify
//! route. The payload checksum is content-derived and safe to log.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use imagelab_core::{ApiError, PREDICT_ENDPOINT, Session};
use imagelab_session::auth_attachment;
use imagelab_transport::{ApiClient, Method, MultipartFile, RequestBody};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Default upload ceiling: 2 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

/// MIME types accepted by the picker. `image/jpg` is a non-standard alias
/// some browsers still emit for JPEG files.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// Form field name the classify route reads the file from.
pub const IMAGE_FIELD_NAME: &str = "image";

/// Rejection message for an unaccepted file type.
pub const TYPE_REJECTION_MESSAGE: &str = "Please select a JPG or PNG image";
/// Rejection message for an oversized file.
pub const SIZE_REJECTION_MESSAGE: &str = "Image must be smaller than 2 MB";
/// Guard message when upload is requested with no file selected.
pub const NO_FILE_MESSAGE: &str = "Please select an image first";
/// Message shown when the retry budget is exhausted.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Retry schedule for transient classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Uniform jitter added on top of each delay.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
            jitter_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff delay before retry `attempt` (zero-based).
    ///
    /// Doubles the base delay per attempt up to the ceiling, then adds
    /// uniform jitter so synchronized clients spread out.
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| {
                    u64::from(elapsed.subsec_nanos()) ^ elapsed.as_secs()
                });
            StdRng::seed_from_u64(seed).random_range(0..=self.jitter_ms)
        };
        exponential.saturating_add(jitter)
    }
}

/// Upload pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes.
    pub max_upload_bytes: u64,
    /// Retry schedule for transient failures.
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retry: RetryPolicy::default(),
        }
    }
}

/// Whether a classify failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient; retry within budget.
    Retriable,
    /// Deterministic; retrying would repeat the same outcome.
    Permanent,
}

/// Classifies a classify-route failure for the retry loop.
///
/// Network failures and server-side statuses are transient; client-side
/// statuses, auth failures, and contract violations are permanent.
pub fn classify_upload_failure(error: &ApiError) -> FailureClass {
    match error {
        ApiError::Network(_) => FailureClass::Retriable,
        ApiError::Http { status, .. } if *status >= 500 => FailureClass::Retriable,
        _ => FailureClass::Permanent,
    }
}

/// Hex-encoded SHA-256 of the payload bytes.
///
/// Stable across retries of the same selection, so it doubles as an
/// idempotency key in logs.
pub fn payload_checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A file accepted by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Original file name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Returns the payload size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Upload pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Nothing selected.
    Idle,
    /// Local validation is running on a fresh selection.
    Validating,
    /// Last selection failed local validation.
    Rejected,
    /// A validated file is staged for upload.
    Ready,
    /// A classify request is in flight.
    Uploading,
    /// The backend returned a usable prediction.
    Succeeded,
    /// The upload failed after exhausting applicable retries.
    Failed,
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// Predicted class label.
    pub label: String,
}

/// Drives the select/preview/upload pipeline.
#[derive(Debug)]
pub struct UploadController {
    config: UploadConfig,
    status: UploadStatus,
    file: Option<SelectedFile>,
    checksum: Option<String>,
    preview: Option<String>,
    prediction: Option<Prediction>,
    error_message: Option<String>,
    last_error: Option<ApiError>,
}

impl UploadController {
    /// Creates an idle controller.
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            status: UploadStatus::Idle,
            file: None,
            checksum: None,
            preview: None,
            prediction: None,
            error_message: None,
            last_error: None,
        }
    }

    /// Returns the current pipeline status.
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Returns the staged file, if any.
    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// Returns the staged payload checksum, if any.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Returns the inline preview as a `data:` URL, if any.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Returns the latest prediction, if any.
    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    /// Returns the user-facing message for the last rejection or failure.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the typed error behind the last failure.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Validates and stages a picked file.
    ///
    /// Type is checked before size so each rejection carries its distinct
    /// message. A rejection clears any previously staged file and preview;
    /// an accepted file replaces them and clears stale results.
    pub fn select_file(&mut self, file: SelectedFile) {
        if self.status == UploadStatus::Uploading {
            return;
        }

        // Validation is synchronous; `Validating` is observable only from
        // within the rejection/acceptance handlers.
        self.status = UploadStatus::Validating;

        if !ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            self.reject(TYPE_REJECTION_MESSAGE);
            return;
        }
        if file.size_bytes() > self.config.max_upload_bytes {
            self.reject(SIZE_REJECTION_MESSAGE);
            return;
        }

        let checksum = payload_checksum(&file.bytes);
        // Re-picking identical bytes keeps the already-encoded preview.
        if self.checksum.as_deref() != Some(checksum.as_str()) {
            self.preview = Some(format!(
                "data:{};base64,{}",
                file.mime_type,
                BASE64.encode(&file.bytes)
            ));
        }

        self.file = Some(file);
        self.checksum = Some(checksum);
        self.prediction = None;
        self.error_message = None;
        self.last_error = None;
        self.status = UploadStatus::Ready;
    }

    /// Submits the staged file to the classify route.
    ///
    /// With no staged file this rejects locally with [`NO_FILE_MESSAGE`] and
    /// issues no request. Size is re-validated at submit time in case the
    /// ceiling changed between selection and upload. Retriable failures are
    /// retried per the configured policy; permanent ones fail immediately.
    pub fn upload(&mut self, client: &ApiClient, session: &Session) {
        if self.status == UploadStatus::Uploading {
            return;
        }

        let Some(file) = self.file.clone() else {
            self.reject(NO_FILE_MESSAGE);
            return;
        };
        if file.size_bytes() > self.config.max_upload_bytes {
            self.reject(SIZE_REJECTION_MESSAGE);
            return;
        }

        self.status = UploadStatus::Uploading;
        self.error_message = None;
        self.last_error = None;

        let mut attempt = 0u32;
        loop {
            let result = client.request(
                PREDICT_ENDPOINT,
                Method::Post,
                RequestBody::Multipart(MultipartFile {
                    field_name: IMAGE_FIELD_NAME.to_string(),
                    file_name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    bytes: file.bytes.clone(),
                }),
                auth_attachment(session),
            );

            match result {
                Ok(body) => {
                    self.apply_response(&body);
                    return;
                }
                Err(error) => {
                    let retriable = classify_upload_failure(&error) == FailureClass::Retriable;
                    if retriable && attempt < self.config.retry.max_retries {
                        let delay = self.config.retry.backoff_delay_ms(attempt);
                        if delay > 0 {
                            thread::sleep(Duration::from_millis(delay));
                        }
                        attempt += 1;
                        continue;
                    }

                    let message = match &error {
                        ApiError::Http { message, .. } => message.clone(),
                        ApiError::Auth(_) => error.to_string(),
                        _ => UPLOAD_FAILED_MESSAGE.to_string(),
                    };
                    self.status = UploadStatus::Failed;
                    self.error_message = Some(message);
                    self.last_error = Some(error);
                    return;
                }
            }
        }
    }

    /// Restores the exact fresh-mount state.
    pub fn reset(&mut self) {
        self.status = UploadStatus::Idle;
        self.file = None;
        self.checksum = None;
        self.preview = None;
        self.prediction = None;
        self.error_message = None;
        self.last_error = None;
    }

    fn apply_response(&mut self, body: &Value) {
        match body.get("predicted_class_name").and_then(Value::as_str) {
            Some(label) if !label.trim().is_empty() => {
                self.prediction = Some(Prediction {
                    label: label.to_string(),
                });
                self.status = UploadStatus::Succeeded;
            }
            _ => {
                let error = ApiError::Contract(
                    "classification response is missing the predicted class".to_string(),
                );
                self.status = UploadStatus::Failed;
                self.error_message = Some(UPLOAD_FAILED_MESSAGE.to_string());
                self.last_error = Some(error);
            }
        }
    }

    fn reject(&mut self, message: &str) {
        self.status = UploadStatus::Rejected;
        self.file = None;
        self.checksum = None;
        self.preview = None;
        self.prediction = None;
        self.error_message = Some(message.to_string());
        self.last_error = Some(ApiError::Validation(message.to_string()));
    }
}

impl Default for UploadController {
    fn default() -> Self {
        Self::new(UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for local validation, retry classification, and the
    //! response contract.

    use std::sync::Arc;

    use imagelab_core::Credential;
    use imagelab_transport::SyntheticBackendTransport;

    use super::*;

    fn jpeg(name: &str, len: usize) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![0xAB; len],
        }
    }

    fn zero_delay_config() -> UploadConfig {
        UploadConfig {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay_ms: 0,
                max_delay_ms: 0,
                jitter_ms: 0,
            },
        }
    }

    fn authed_harness(
        transport: Arc<SyntheticBackendTransport>,
    ) -> (ApiClient, Session) {
        transport.seed_user("ada", "pass1234");
        let client =
            ApiClient::new("https://api.imagelab.test", transport.clone()).expect("client");
        let body = client
            .request(
                imagelab_core::LOGIN_ENDPOINT,
                Method::Post,
                RequestBody::Json(serde_json::json!({"username": "ada", "password": "pass1234"})),
                imagelab_transport::AuthAttachment::None,
            )
            .expect("login");
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .expect("token")
            .to_string();
        let session = Session::authenticated("ada", Credential::Bearer(token));
        (client, session)
    }

    #[test]
    fn rejects_unaccepted_type_before_size() {
        let mut controller = UploadController::default();

        controller.select_file(SelectedFile {
            name: "notes.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: vec![0; (DEFAULT_MAX_UPLOAD_BYTES + 1) as usize],
        });

        assert_eq!(controller.status(), UploadStatus::Rejected);
        assert_eq!(controller.error_message(), Some(TYPE_REJECTION_MESSAGE));
        assert!(controller.file().is_none());
        assert!(controller.preview().is_none());
    }

    #[test]
    fn rejects_oversized_file_and_clears_previous_selection() {
        let mut controller = UploadController::default();

        controller.select_file(jpeg("ball.jpg", 64));
        assert_eq!(controller.status(), UploadStatus::Ready);
        assert!(controller.preview().is_some());

        controller.select_file(jpeg("huge.jpg", (DEFAULT_MAX_UPLOAD_BYTES + 1) as usize));
        assert_eq!(controller.status(), UploadStatus::Rejected);
        assert_eq!(controller.error_message(), Some(SIZE_REJECTION_MESSAGE));
        assert!(controller.file().is_none());
        assert!(controller.preview().is_none());
    }

    #[test]
    fn accepted_file_stages_preview_and_checksum() {
        let mut controller = UploadController::default();
        let file = jpeg("ball.jpg", 16);
        let expected_checksum = payload_checksum(&file.bytes);

        controller.select_file(file);

        assert_eq!(controller.status(), UploadStatus::Ready);
        assert_eq!(controller.checksum(), Some(expected_checksum.as_str()));
        let preview = controller.preview().expect("preview should exist");
        assert!(preview.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn upload_without_file_issues_no_request() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        let (client, session) = authed_harness(transport.clone());
        let before = transport.request_count();
        let mut controller = UploadController::default();

        controller.upload(&client, &session);

        // A local pre-flight refusal, not a transport failure.
        assert_eq!(controller.status(), UploadStatus::Rejected);
        assert_eq!(controller.error_message(), Some(NO_FILE_MESSAGE));
        assert_eq!(transport.request_count(), before);
    }

    #[test]
    fn successful_upload_yields_prediction() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        let (client, session) = authed_harness(transport.clone());
        let mut controller = UploadController::new(zero_delay_config());

        controller.select_file(jpeg("ball.jpg", 5));
        controller.upload(&client, &session);

        assert_eq!(controller.status(), UploadStatus::Succeeded);
        let prediction = controller.prediction().expect("prediction should exist");
        assert_eq!(prediction.label, "cricket_ball");
    }

    #[test]
    fn transient_network_failures_are_retried() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        let (client, session) = authed_harness(transport.clone());
        let mut controller = UploadController::new(zero_delay_config());
        controller.select_file(jpeg("ball.jpg", 5));

        // Armed after login so only the classify attempts hit the failures.
        transport.set_network_failures(2);
        controller.upload(&client, &session);

        assert_eq!(controller.status(), UploadStatus::Succeeded);
        assert_eq!(transport.request_count(), 4);
    }

    #[test]
    fn unauthenticated_upload_fails_permanently() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        let client =
            ApiClient::new("https://api.imagelab.test", transport.clone()).expect("client");
        let mut controller = UploadController::new(zero_delay_config());

        controller.select_file(jpeg("ball.jpg", 5));
        let before = transport.request_count();
        controller.upload(&client, &Session::anonymous());

        assert_eq!(controller.status(), UploadStatus::Failed);
        assert!(matches!(
            controller.last_error(),
            Some(ApiError::Http { status: 401, .. })
        ));
        assert_eq!(transport.request_count(), before + 1);
    }

    #[test]
    fn missing_predicted_class_is_a_contract_failure() {
        let transport = Arc::new(SyntheticBackendTransport::new().with_contract_violation());
        let (client, session) = authed_harness(transport.clone());
        let mut controller = UploadController::new(zero_delay_config());

        controller.select_file(jpeg("ball.jpg", 5));
        controller.upload(&client, &session);

        assert_eq!(controller.status(), UploadStatus::Failed);
        assert!(matches!(
            controller.last_error(),
            Some(ApiError::Contract(_))
        ));
    }

    #[test]
    fn reset_restores_fresh_mount_state() {
        let mut controller = UploadController::default();
        controller.select_file(jpeg("ball.jpg", 8));

        controller.reset();

        assert_eq!(controller.status(), UploadStatus::Idle);
        assert!(controller.file().is_none());
        assert!(controller.preview().is_none());
        assert!(controller.prediction().is_none());
        assert!(controller.error_message().is_none());
    }

    #[test]
    fn backoff_delay_doubles_and_respects_ceiling() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay_ms: 100,
            max_delay_ms: 300,
            jitter_ms: 0,
        };

        assert_eq!(policy.backoff_delay_ms(0), 100);
        assert_eq!(policy.backoff_delay_ms(1), 200);
        assert_eq!(policy.backoff_delay_ms(2), 300);
        assert_eq!(policy.backoff_delay_ms(5), 300);
    }

    #[test]
    fn classification_separates_retriable_from_permanent() {
        assert_eq!(
            classify_upload_failure(&ApiError::Network("reset".to_string())),
            FailureClass::Retriable
        );
        assert_eq!(
            classify_upload_failure(&ApiError::Http {
                status: 503,
                message: "unavailable".to_string(),
            }),
            FailureClass::Retriable
        );
        assert_eq!(
            classify_upload_failure(&ApiError::Http {
                status: 400,
                message: "bad".to_string(),
            }),
            FailureClass::Permanent
        );
        assert_eq!(
            classify_upload_failure(&ApiError::Contract("missing".to_string())),
            FailureClass::Permanent
        );
    }
}
