//! Challenge/verify authentication flows.
//!
//! Orchestrates the two-phase flows against the server:
//! - registration: `/auth/register` then `/auth/verify/register`
//! - login: `/auth/login` then `/auth/verify/login`
//! - profile refresh (`/user/get`) and username update (`/user/username`)
//!
//! ## Design Decisions
//! - The session store is written only at the end of a fully successful
//!   verify/update chain. A verify that succeeds at the network layer but
//!   fails the follow-up profile fetch leaves the store untouched.
//! - The server's error-body conventions differ per endpoint (JSON
//!   `{message}` on initiation, plain text on verify, a fixed string on
//!   profile-get); each call site names its convention explicitly.
//! - Independent callers are not serialized: two flows racing on the same
//!   store resolve as last-write-wins.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use crate::client::RequestClient;
use crate::config::AuthConfig;
use crate::credentials::CredentialProvider;
use crate::error::{self, AuthError};
use crate::session::{SessionStore, UserProfile};

/// Fixed message for profile-get failures; that endpoint never returns a
/// structured error body.
const FETCH_PROFILE_FAILED: &str = "Failed to fetch user info";

// ── Flow state ──────────────────────────────────────────────────

/// Where a challenge/verify flow currently stands. Registration and login
/// share the shape. `Failed` is terminal; restart from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No flow in progress.
    Idle,
    /// Initiation request in flight.
    Requested,
    /// Initiation accepted; a one-time code is on its way out-of-band.
    AwaitingCode,
    /// Code accepted, session established.
    Verified,
    /// The flow hit a terminal failure.
    Failed,
}

/// Which error-body convention an endpoint follows.
#[derive(Debug, Clone, Copy)]
enum ErrorBody {
    /// JSON `{message}`, with a fallback when absent or unparsable.
    JsonMessage(&'static str),
    /// The raw response text is the message.
    PlainText,
    /// A fixed message regardless of body.
    Fixed(&'static str),
}

/// Rewrite a request-layer rejection per the endpoint's convention.
/// Network/validation errors pass through untouched.
fn surface(err: AuthError, convention: ErrorBody) -> AuthError {
    match err {
        AuthError::ServerRejected { status, message } => {
            let message = match convention {
                ErrorBody::JsonMessage(fallback) => error::json_message(&message, fallback),
                ErrorBody::PlainText => message,
                ErrorBody::Fixed(text) => text.to_string(),
            };
            AuthError::ServerRejected { status, message }
        }
        AuthError::ServerRejectedOpaque { status } => match convention {
            ErrorBody::JsonMessage(fallback) => AuthError::ServerRejected {
                status,
                message: fallback.to_string(),
            },
            ErrorBody::Fixed(text) => AuthError::ServerRejected {
                status,
                message: text.to_string(),
            },
            ErrorBody::PlainText => AuthError::ServerRejectedOpaque { status },
        },
        other => other,
    }
}

/// Coerce a user-typed code to the numeric form the server expects.
/// Must fail before any network call when the string is not numeric.
fn parse_code(code: &str) -> Result<u32, AuthError> {
    code.trim()
        .parse::<u32>()
        .map_err(|_| AuthError::Validation(format!("verification code must be numeric, got {code:?}")))
}

// ── Controller ──────────────────────────────────────────────────

/// Drives the challenge/verify flows and is the only writer of
/// [`SessionStore`].
pub struct AuthFlowController {
    client: RequestClient,
    session: Arc<SessionStore>,
    credentials: Arc<CredentialProvider>,
    state: Mutex<FlowState>,
}

impl AuthFlowController {
    pub fn new(
        client: RequestClient,
        session: Arc<SessionStore>,
        credentials: Arc<CredentialProvider>,
    ) -> Self {
        Self {
            client,
            session,
            credentials,
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// Wire up a controller, store, and provider from one config,
    /// opening the configured storage files.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let credentials = Arc::new(match &config.token_path {
            Some(path) => CredentialProvider::open(path),
            None => CredentialProvider::new(),
        });
        let session = Arc::new(match &config.session_path {
            Some(path) => SessionStore::open(path),
            None => SessionStore::new(),
        });
        let client = RequestClient::new(config, credentials.clone())?;
        Ok(Self::new(client, session, credentials))
    }

    /// The session store this controller writes. Consumers subscribe here.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The credential provider backing the request client.
    pub fn credentials(&self) -> &Arc<CredentialProvider> {
        &self.credentials
    }

    /// Current flow state.
    pub fn state(&self) -> FlowState {
        *self.state.lock()
    }

    fn transition(&self, next: FlowState) {
        tracing::debug!(state = ?next, "auth flow transition");
        *self.state.lock() = next;
    }

    // ── Registration ────────────────────────────────────────────

    /// Ask the server to start a registration and send a one-time code.
    /// Grants no session; the store is not touched.
    pub async fn request_registration(&self, username: &str, email: &str) -> Result<(), AuthError> {
        self.transition(FlowState::Requested);
        match self
            .client
            .post("/auth/register", json!({"username": username, "email": email}))
            .await
        {
            Ok(_) => {
                self.transition(FlowState::AwaitingCode);
                Ok(())
            }
            Err(err) => {
                self.transition(FlowState::Failed);
                Err(surface(err, ErrorBody::JsonMessage("Registration failed")))
            }
        }
    }

    /// Exchange the one-time code for a session, then pull the profile
    /// into the store. The verify response carries the session credential.
    pub async fn verify_registration(
        &self,
        username: &str,
        email: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let code = match parse_code(code) {
            Ok(code) => code,
            Err(err) => {
                self.transition(FlowState::Failed);
                return Err(err);
            }
        };

        let result = self
            .client
            .post(
                "/auth/verify/register",
                json!({"username": username, "email": email, "code": code}),
            )
            .await;
        self.finish_verify(result).await
    }

    // ── Login ───────────────────────────────────────────────────

    /// Ask the server to start a login and send a one-time code.
    pub async fn request_login(&self, email: &str) -> Result<(), AuthError> {
        self.transition(FlowState::Requested);
        match self.client.post("/auth/login", json!({"email": email})).await {
            Ok(_) => {
                self.transition(FlowState::AwaitingCode);
                Ok(())
            }
            Err(err) => {
                self.transition(FlowState::Failed);
                Err(surface(err, ErrorBody::JsonMessage("Login failed")))
            }
        }
    }

    /// Exchange the one-time login code for a session.
    pub async fn verify_login(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let code = match parse_code(code) {
            Ok(code) => code,
            Err(err) => {
                self.transition(FlowState::Failed);
                return Err(err);
            }
        };

        let result = self
            .client
            .post("/auth/verify/login", json!({"email": email, "code": code}))
            .await;
        self.finish_verify(result).await
    }

    /// Shared tail of both verify flows: on a verified code, fetch the
    /// authoritative profile and only then flip the store. Any failure on
    /// the way — including the profile fetch — leaves the store untouched.
    async fn finish_verify(
        &self,
        verify_result: Result<serde_json::Value, AuthError>,
    ) -> Result<(), AuthError> {
        if let Err(err) = verify_result {
            self.transition(FlowState::Failed);
            // Verify endpoints answer with plain text, not JSON.
            return Err(surface(err, ErrorBody::PlainText));
        }

        match self.refresh_profile().await {
            Ok(profile) => {
                self.session.set_authenticated(profile);
                self.transition(FlowState::Verified);
                Ok(())
            }
            Err(err) => {
                self.transition(FlowState::Failed);
                Err(err)
            }
        }
    }

    // ── Profile ─────────────────────────────────────────────────

    /// Fetch the current profile. Pure read: callers decide whether it
    /// lands in the session store.
    pub async fn refresh_profile(&self) -> Result<UserProfile, AuthError> {
        let value = self
            .client
            .get("/user/get")
            .await
            .map_err(|err| surface(err, ErrorBody::Fixed(FETCH_PROFILE_FAILED)))?;
        UserProfile::from_value(value)
    }

    /// Change the username, then replace the stored profile with the
    /// server's refreshed copy — never a client-side patch, so store and
    /// server cannot disagree about derived fields.
    pub async fn update_username(&self, username: &str) -> Result<(), AuthError> {
        if !self.session.read().is_authenticated {
            return Err(AuthError::InvalidState(
                "cannot update username while logged out".into(),
            ));
        }

        self.client
            .post("/user/username", json!({"username": username}))
            .await
            .map_err(|err| surface(err, ErrorBody::JsonMessage("Failed to update username")))?;

        let profile = self.refresh_profile().await?;
        self.session.set_authenticated(profile);
        Ok(())
    }

    /// Drop the session and credential, client-side only.
    pub fn logout(&self) {
        self.credentials.clear();
        self.session.clear();
        self.transition(FlowState::Idle);
    }
}

// ── Tests ───────────────────────────────────────────────────────
