//! Client SDK for email-code challenge/verify login.
//!
//! Provides:
//! - [`SessionStore`]: one persisted, reactive record of "is the user
//!   authenticated and who are they", surviving process restarts
//! - [`CredentialProvider`]: the current bearer token, read fresh on
//!   every outgoing request (cookie deployments use the client's jar)
//! - [`RequestClient`]: GET/POST/PUT/DELETE against a configured base
//!   address with typed failures
//! - [`AuthFlowController`]: the register→verify and login→verify flows,
//!   profile refresh, and username update
//!
//! ## Design
//! - The session record is all-or-nothing: it only flips to
//!   authenticated once the verified session has produced a profile.
//! - Failures are always observable as a returned [`AuthError`], never
//!   swallowed; the store is untouched on every failure path.
//! - Construct once, share by `Arc` — no ambient globals, so tests can
//!   inject doubles.
//!
//! ```no_run
//! use authflow::{AuthConfig, AuthFlowController};
//!
//! # async fn demo() -> Result<(), authflow::AuthError> {
//! let config = AuthConfig::new("http://localhost:8080/api").with_default_paths();
//! let flow = AuthFlowController::from_config(&config)?;
//!
//! flow.request_login("a@x.com").await?;
//! // ...user reads the one-time code from their inbox...
//! flow.verify_login("a@x.com", "482913").await?;
//! assert!(flow.session().read().is_authenticated);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod session;

pub use client::RequestClient;
pub use config::{AuthConfig, CredentialMode};
pub use credentials::CredentialProvider;
pub use error::AuthError;
pub use flow::{AuthFlowController, FlowState};
pub use session::{SessionRecord, SessionStore, SubscriptionId, UserProfile};
