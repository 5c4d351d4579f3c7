#![warn(missing_docs)]
//! # imagelab-transport
//!
//! ## Purpose
//! Implements the thin request layer between client controllers and the
//! ImageLab backend.
//!
//! ## Responsibilities
//! - Validate the configured API base URL.
//! - Issue authenticated/unauthenticated requests through an injectable
//!   [`HttpTransport`] abstraction.
//! - Normalize success and failure shapes: 2xx bodies pass through, non-2xx
//!   statuses are classified once into the shared error taxonomy.
//! - Provide a deterministic synthetic backend for CI and unit tests.
//!
//! ## Data flow
//! Controller builds endpoint/method/body -> [`ApiClient::request`] attaches
//! the credential and sends through [`HttpTransport`] -> non-success statuses
//! become typed [`ApiError`] values via `imagelab_core::classify_failure`.
//!
//! ## Ownership and lifetimes
//! Requests and responses own their buffers; nothing borrows from transport
//! internals across calls.
//!
//! ## Error model
//! Transport-level failures surface as [`ApiError::Network`]. This layer never
//! mutates session state; callers decide how to react to auth failures.
//!
//! ## Security and privacy notes
//! Bearer tokens pass through as opaque strings and are never logged here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use imagelab_core::{ApiError, classify_failure};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

/// HTTP method subset used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

/// One file carried as a multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Form field name (the predict route expects `image`).
    pub field_name: String,
    /// Original file name.
    pub file_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Request body shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON body serialized by the transport.
    Json(Value),
    /// Single-file multipart form body.
    Multipart(MultipartFile),
}

/// Credential attachment mode for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAttachment {
    /// Unauthenticated request.
    None,
    /// Attach `Authorization: Bearer <token>`.
    Bearer(String),
    /// Cookie mode: send with browser-managed credentials attached.
    Ambient,
}

/// Fully resolved request handed to a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute request URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request body.
    pub body: RequestBody,
    /// Bearer token to attach, when present.
    pub bearer: Option<String>,
    /// Whether ambient cookies must accompany the request.
    pub with_cookies: bool,
}

/// Raw response produced by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `null` when the response had none.
    pub body: Value,
}

/// Transport-level failure: the request could not complete at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct NetworkFailure(pub String);

/// Abstract request executor injected into [`ApiClient`].
pub trait HttpTransport: Send + Sync {
    /// Executes one request and returns the raw status/body pair.
    ///
    /// # Errors
    /// Returns [`NetworkFailure`] when the call cannot complete (DNS or
    /// connection failure, aborted request).
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkFailure>;
}

/// Request client owning the base URL and transport handle.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    /// Creates a validated API client.
    ///
    /// # Errors
    /// Returns [`ApiError::Validation`] when the base URL does not parse or
    /// uses a scheme other than `http`/`https`.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|error| ApiError::Validation(format!("invalid api base url: {error}")))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(ApiError::Validation(
                "api base url must use http or https".to_string(),
            ));
        }

        Ok(Self {
            base_url: parsed,
            transport,
        })
    }

    /// Issues one request and returns the parsed success body.
    ///
    /// # Errors
    /// - [`ApiError::Network`] when the transport cannot complete the call.
    /// - A classified taxonomy error for every non-2xx status.
    pub fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: RequestBody,
        auth: AuthAttachment,
    ) -> Result<Value, ApiError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|error| ApiError::Validation(format!("invalid endpoint path: {error}")))?;

        let (bearer, with_cookies) = match auth {
            AuthAttachment::None => (None, false),
            AuthAttachment::Bearer(token) => (Some(token), false),
            AuthAttachment::Ambient => (None, true),
        };

        let response = self
            .transport
            .send(&HttpRequest {
                url: url.to_string(),
                method,
                body,
                bearer,
                with_cookies,
            })
            .map_err(|failure| ApiError::Network(failure.0))?;

        if (200..300).contains(&response.status) {
            return Ok(response.body);
        }

        Err(classify_failure(response.status, &response.body))
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

/// Login attempts allowed by the synthetic backend before lockout.
pub const SYNTHETIC_MAX_LOGIN_ATTEMPTS: u32 = 3;
/// Lockout remainder the synthetic backend reports, in minutes.
pub const SYNTHETIC_LOCKOUT_MINUTES: u32 = 15;
/// Fixed passcode issued by the synthetic backend.
pub const SYNTHETIC_OTP_CODE: &str = "246810";

const SYNTHETIC_LABELS: [&str; 4] = ["basketball", "cricket_ball", "football", "tennis_ball"];

#[derive(Debug, Default)]
struct SyntheticBackendState {
    users: HashMap<String, String>,
    failed_attempts: HashMap<String, u32>,
    locked: Vec<String>,
    pending_otps: HashMap<String, String>,
    issued_tokens: Vec<String>,
    cookie_user: Option<String>,
    requests: u32,
    network_failures_remaining: u32,
}

/// Deterministic in-process stand-in for the ImageLab backend.
///
/// Implements the documented wire contracts so controllers can be exercised
/// end to end without a server. Knobs simulate logout failure, predicted-field
/// omission, and transient network failure.
#[derive(Debug, Default)]
pub struct SyntheticBackendTransport {
    state: Mutex<SyntheticBackendState>,
    fail_logout: bool,
    omit_predicted_field: bool,
}

impl SyntheticBackendTransport {
    /// Creates an empty synthetic backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account without going through the signup flow.
    pub fn seed_user(&self, username: impl Into<String>, password: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.users.insert(username.into(), password.into());
        }
    }

    /// Makes `/logout` answer with a server failure.
    pub fn with_failing_logout(mut self) -> Self {
        self.fail_logout = true;
        self
    }

    /// Makes `/predict` succeed without the predicted-class field.
    pub fn with_contract_violation(mut self) -> Self {
        self.omit_predicted_field = true;
        self
    }

    /// Makes the next `count` sends fail at the transport level.
    pub fn with_network_failures(self, count: u32) -> Self {
        self.set_network_failures(count);
        self
    }

    /// Arms the network-failure budget on an already shared backend, so
    /// earlier requests (login, seeding probes) are unaffected.
    pub fn set_network_failures(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.network_failures_remaining = count;
        }
    }

    /// Returns how many requests reached this backend, including ones that
    /// failed at the simulated network layer.
    pub fn request_count(&self) -> u32 {
        self.state.lock().map(|state| state.requests).unwrap_or(0)
    }

    fn handle(
        &self,
        state: &mut SyntheticBackendState,
        request: &HttpRequest,
    ) -> Result<HttpResponse, NetworkFailure> {
        let path = Url::parse(&request.url)
            .map(|url| url.path().to_string())
            .map_err(|error| NetworkFailure(format!("unresolvable url: {error}")))?;

        let response = match (request.method, path.as_str()) {
            (Method::Post, "/login") => self.handle_login(state, request),
            (Method::Post, "/signup") => handle_signup(state, request),
            (Method::Post, "/send-otp") => handle_send_otp(state, request),
            (Method::Post, "/verify-otp") => handle_verify_otp(state, request),
            (Method::Post, "/predict") => self.handle_predict(state, request),
            (Method::Post, "/logout") => self.handle_logout(state, request),
            (Method::Get, "/me") => handle_me(state, request),
            _ => HttpResponse {
                status: 404,
                body: json!({"message": format!("Unknown route {path}")}),
            },
        };

        Ok(response)
    }

    fn handle_login(&self, state: &mut SyntheticBackendState, request: &HttpRequest) -> HttpResponse {
        let (username, password) = match credentials_from(request) {
            Some(pair) => pair,
            None => {
                return HttpResponse {
                    status: 400,
                    body: json!({"message": "Username and password are required"}),
                };
            }
        };

        if state.locked.contains(&username) {
            return locked_response();
        }

        let valid = state.users.get(&username) == Some(&password);
        if valid {
            state.failed_attempts.remove(&username);
            let token = format!("synthetic-token-{username}");
            state.issued_tokens.push(token.clone());
            state.cookie_user = Some(username);
            return HttpResponse {
                status: 200,
                body: json!({"token": token}),
            };
        }

        let attempts = state.failed_attempts.entry(username.clone()).or_insert(0);
        *attempts += 1;
        if *attempts >= SYNTHETIC_MAX_LOGIN_ATTEMPTS {
            state.locked.push(username);
            return locked_response();
        }

        let remaining = SYNTHETIC_MAX_LOGIN_ATTEMPTS - *attempts;
        HttpResponse {
            status: 401,
            body: json!({
                "remaining_attempts": remaining,
                "message": format!("Invalid password. {remaining} attempts remaining before account lockout."),
            }),
        }
    }

    fn handle_predict(
        &self,
        state: &mut SyntheticBackendState,
        request: &HttpRequest,
    ) -> HttpResponse {
        if !is_authorized(state, request) {
            return HttpResponse {
                status: 401,
                body: json!({"error": "Missing Authorization header"}),
            };
        }

        let RequestBody::Multipart(file) = &request.body else {
            return HttpResponse {
                status: 400,
                body: json!({"error": "No image file provided"}),
            };
        };

        if self.omit_predicted_field {
            return HttpResponse {
                status: 200,
                body: json!({"user_id": "synthetic-user"}),
            };
        }

        let label = SYNTHETIC_LABELS[file.bytes.len() % SYNTHETIC_LABELS.len()];
        HttpResponse {
            status: 200,
            body: json!({
                "predicted_class_name": label,
                "user_id": "synthetic-user",
            }),
        }
    }

    fn handle_logout(
        &self,
        state: &mut SyntheticBackendState,
        request: &HttpRequest,
    ) -> HttpResponse {
        if self.fail_logout {
            return HttpResponse {
                status: 500,
                body: json!({"message": "Logout failed"}),
            };
        }

        if let Some(token) = &request.bearer {
            state.issued_tokens.retain(|issued| issued != token);
        }
        if request.with_cookies {
            state.cookie_user = None;
        }

        HttpResponse {
            status: 200,
            body: json!({"message": "Logged out"}),
        }
    }
}

impl HttpTransport for SyntheticBackendTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkFailure> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NetworkFailure("synthetic backend lock poisoned".to_string()))?;
        state.requests += 1;

        if state.network_failures_remaining > 0 {
            state.network_failures_remaining -= 1;
            return Err(NetworkFailure("simulated connection failure".to_string()));
        }

        self.handle(&mut state, request)
    }
}

fn handle_signup(state: &mut SyntheticBackendState, request: &HttpRequest) -> HttpResponse {
    let (username, password) = match credentials_from(request) {
        Some(pair) => pair,
        None => {
            return HttpResponse {
                status: 400,
                body: json!({"message": "Username and password are required"}),
            };
        }
    };

    if state.users.contains_key(&username) {
        return HttpResponse {
            status: 409,
            body: json!({"error": "User already exists"}),
        };
    }

    let user_id = format!("user-{}", state.users.len() + 1);
    state.users.insert(username, password);
    HttpResponse {
        status: 201,
        body: json!({"message": "User created successfully!", "user_id": user_id}),
    }
}

fn handle_send_otp(state: &mut SyntheticBackendState, request: &HttpRequest) -> HttpResponse {
    let Some(username) = json_field(request, "username") else {
        return HttpResponse {
            status: 400,
            body: json!({"error": "Username is required"}),
        };
    };

    state
        .pending_otps
        .insert(username, SYNTHETIC_OTP_CODE.to_string());
    HttpResponse {
        status: 200,
        body: json!({}),
    }
}

fn handle_verify_otp(state: &mut SyntheticBackendState, request: &HttpRequest) -> HttpResponse {
    let username = json_field(request, "username").unwrap_or_default();
    let otp = json_field(request, "otp").unwrap_or_default();

    if state.pending_otps.get(&username) == Some(&otp) {
        state.pending_otps.remove(&username);
        return HttpResponse {
            status: 200,
            body: json!({}),
        };
    }

    HttpResponse {
        status: 400,
        body: json!({"error": "Invalid or expired OTP"}),
    }
}

fn handle_me(state: &mut SyntheticBackendState, request: &HttpRequest) -> HttpResponse {
    let user = if is_authorized(state, request) {
        state
            .cookie_user
            .clone()
            .or_else(|| token_user(request))
            .map(Value::String)
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    HttpResponse {
        status: 200,
        body: json!({"user": user}),
    }
}

fn is_authorized(state: &SyntheticBackendState, request: &HttpRequest) -> bool {
    if let Some(token) = &request.bearer {
        return state.issued_tokens.iter().any(|issued| issued == token);
    }
    request.with_cookies && state.cookie_user.is_some()
}

fn token_user(request: &HttpRequest) -> Option<String> {
    request
        .bearer
        .as_ref()
        .and_then(|token| token.strip_prefix("synthetic-token-"))
        .map(str::to_string)
}

fn credentials_from(request: &HttpRequest) -> Option<(String, String)> {
    let username = json_field(request, "username")?;
    let password = json_field(request, "password")?;
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some((username, password))
}

fn json_field(request: &HttpRequest, key: &str) -> Option<String> {
    match &request.body {
        RequestBody::Json(body) => body.get(key).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn locked_response() -> HttpResponse {
    HttpResponse {
        status: 403,
        body: json!({
            "locked": true,
            "lockout_remaining": SYNTHETIC_LOCKOUT_MINUTES,
            "message": "Your account has been temporarily locked due to too many failed attempts.",
        }),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client URL policy and synthetic backend contracts.

    use imagelab_core::AuthFailure;

    use super::*;

    fn client(transport: Arc<SyntheticBackendTransport>) -> ApiClient {
        ApiClient::new("https://api.imagelab.test", transport).expect("client should build")
    }

    fn login_body(username: &str, password: &str) -> RequestBody {
        RequestBody::Json(json!({"username": username, "password": password}))
    }

    #[test]
    fn rejects_non_http_base_urls() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        assert!(ApiClient::new("ftp://api.imagelab.test", transport.clone()).is_err());
        assert!(ApiClient::new("not a url", transport).is_err());
    }

    #[test]
    fn successful_login_returns_token_body() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        transport.seed_user("ada", "pass1234");
        let client = client(transport);

        let body = client
            .request(
                imagelab_core::LOGIN_ENDPOINT,
                Method::Post,
                login_body("ada", "pass1234"),
                AuthAttachment::None,
            )
            .expect("login should succeed");
        assert_eq!(
            body.get("token").and_then(Value::as_str),
            Some("synthetic-token-ada")
        );
    }

    #[test]
    fn repeated_failures_escalate_to_lockout() {
        let transport = Arc::new(SyntheticBackendTransport::new());
        transport.seed_user("ada", "pass1234");
        let client = client(transport);

        for expected_remaining in [2u32, 1] {
            let error = client
                .request(
                    imagelab_core::LOGIN_ENDPOINT,
                    Method::Post,
                    login_body("ada", "wrong"),
                    AuthAttachment::None,
                )
                .expect_err("wrong password should fail");
            assert_eq!(
                error,
                ApiError::Auth(AuthFailure::InvalidCredentials {
                    remaining_attempts: Some(expected_remaining),
                    message: Some(format!(
                        "Invalid password. {expected_remaining} attempts remaining before account lockout."
                    )),
                })
            );
        }

        let error = client
            .request(
                imagelab_core::LOGIN_ENDPOINT,
                Method::Post,
                login_body("ada", "wrong"),
                AuthAttachment::None,
            )
            .expect_err("third failure should lock");
        assert!(matches!(
            error,
            ApiError::Auth(AuthFailure::Locked {
                lockout_remaining_minutes: Some(SYNTHETIC_LOCKOUT_MINUTES),
                ..
            })
        ));
    }

    #[test]
    fn network_failure_surfaces_as_network_error() {
        let transport = Arc::new(SyntheticBackendTransport::new().with_network_failures(1));
        let client = client(transport);

        let error = client
            .request(
                imagelab_core::ME_ENDPOINT,
                Method::Get,
                RequestBody::Empty,
                AuthAttachment::None,
            )
            .expect_err("simulated failure should surface");
        assert!(matches!(error, ApiError::Network(_)));
    }
}
