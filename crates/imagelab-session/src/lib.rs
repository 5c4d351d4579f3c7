#![warn(missing_docs)]
//! # imagelab-session
//!
//! ## Purpose
//! Owns the authentication session lifecycle for the ImageLab client.
//!
//! ## Responsibilities
//! - Rehydrate the session exactly once from a persistence capability.
//! - Expose the `login`/`logout` transitions; no other component mutates
//!   session state.
//! - Confirm logout with the backend before clearing local state.
//! - Probe the server's session view through `/me`.
//!
//! ## Data flow
//! Startup -> [`SessionManager::initialize`] restores from [`SessionStore`] ->
//! controllers request transitions -> observers read the published
//! [`imagelab_core::Session`] value.
//!
//! ## Ownership and lifetimes
//! The manager owns its session value; readers receive shared references and
//! may never mutate through them.
//!
//! ## Error model
//! Store failures surface as [`SessionError::Store`]; backend failures during
//! logout propagate untouched so callers can keep the session alive.
//!
//! ## Security and privacy notes
//! In cookie mode the credential is browser-managed and never duplicated into
//! client storage; only the username is persisted.

use std::sync::{Arc, Mutex};

use imagelab_core::{ApiError, Credential, LOGOUT_ENDPOINT, ME_ENDPOINT, Session};
use imagelab_transport::{ApiClient, AuthAttachment, Method, RequestBody};
use serde_json::Value;
use thiserror::Error;

/// Persistence capability for session state.
///
/// Implementations cover both deployment modes: bearer-token storage persists
/// token and username, cookie-mode storage persists the username only (the
/// [`Credential::Cookie`] variant carries no secret).
pub trait SessionStore: Send + Sync {
    /// Persists the given session value.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] when the backing slot is unusable.
    fn persist(&self, session: &Session) -> Result<(), SessionError>;

    /// Restores the previously persisted session, if any.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] when the backing slot is unreadable.
    fn restore(&self) -> Result<Option<Session>, SessionError>;

    /// Clears the persisted session.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] when the backing slot is unusable.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session-scoped in-memory store.
///
/// Stands in for the browser's session storage slot; tests preload it to
/// exercise rehydration.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with one persisted session.
    pub fn preloaded(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Store("session slot lock poisoned".to_string()))?;
        *slot = Some(session.clone());
        Ok(())
    }

    fn restore(&self) -> Result<Option<Session>, SessionError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Store("session slot lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SessionError::Store("session slot lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Session state machine with `Anonymous` and `Authenticated` states.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    session: Session,
}

impl SessionManager {
    /// Creates the manager and performs the single rehydration pass.
    ///
    /// A missing, partial, or unreadable persisted value leaves the manager
    /// `Anonymous`; a failed restore also clears the slot so later runs start
    /// clean.
    pub fn initialize(store: Arc<dyn SessionStore>) -> Self {
        let session = match store.restore() {
            Ok(Some(restored)) if restored.is_authenticated() => restored,
            Ok(Some(_)) | Err(_) => {
                let _ = store.clear();
                Session::anonymous()
            }
            Ok(None) => Session::anonymous(),
        };

        Self { store, session }
    }

    /// Returns the published session value (read-only to callers).
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies the login transition: persist both values, then become
    /// `Authenticated`. Calling again simply overwrites.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] when persistence fails; session state
    /// is left untouched in that case.
    pub fn login(
        &mut self,
        username: impl Into<String>,
        credential: Credential,
    ) -> Result<(), SessionError> {
        let next = Session::authenticated(username, credential);
        if !next.is_authenticated() {
            return Err(SessionError::IncompleteCredential);
        }

        self.store.persist(&next)?;
        self.session = next;
        Ok(())
    }

    /// Applies the logout transition after server confirmation.
    ///
    /// The `/logout` call must succeed before any local state is cleared; on
    /// backend failure the session is left untouched and the error propagates.
    ///
    /// # Errors
    /// Returns [`SessionError::Api`] when the backend rejects or the call
    /// cannot complete, and [`SessionError::Store`] when clearing fails.
    pub fn logout(&mut self, client: &ApiClient) -> Result<(), SessionError> {
        client.request(
            LOGOUT_ENDPOINT,
            Method::Post,
            RequestBody::Empty,
            auth_attachment(&self.session),
        )?;

        self.store.clear()?;
        self.session = Session::anonymous();
        Ok(())
    }

    /// Probes `/me` and returns the server's view of the session user.
    ///
    /// Does not mutate local session state; a `null` user is the caller's
    /// signal to route to login.
    ///
    /// # Errors
    /// Propagates transport and classification failures.
    pub fn fetch_profile(&self, client: &ApiClient) -> Result<Option<String>, ApiError> {
        let body = client.request(
            ME_ENDPOINT,
            Method::Get,
            RequestBody::Empty,
            auth_attachment(&self.session),
        )?;

        match body.get("user") {
            Some(Value::String(user)) => Ok(Some(user.clone())),
            Some(Value::Null) => Ok(None),
            // Some deployments wrap the user record in an object.
            Some(Value::Object(record)) => Ok(record
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)),
            _ => Err(ApiError::Contract(
                "response is missing the user field".to_string(),
            )),
        }
    }
}

/// Derives the transport credential attachment for the current session.
pub fn auth_attachment(session: &Session) -> AuthAttachment {
    match session.credential() {
        Some(Credential::Bearer(token)) => AuthAttachment::Bearer(token.clone()),
        Some(Credential::Cookie) => AuthAttachment::Ambient,
        None => AuthAttachment::None,
    }
}

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Persistence slot failure.
    #[error("session store failure: {0}")]
    Store(String),
    /// Login transition attempted with blank username or empty token.
    #[error("login requires a username and a complete credential")]
    IncompleteCredential,
    /// Backend call failure during a confirmed transition.
    #[error(transparent)]
    Api(#[from] ApiError),
}
