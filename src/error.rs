//! Error taxonomy for the auth client.
//!
//! Expected network and HTTP conditions are returned, never panicked:
//! the request layer normalizes transport failures and non-2xx responses
//! into `AuthError`, and the flow layer re-surfaces them with the message
//! convention of the endpoint that produced them.

use thiserror::Error;

/// Failure channel shared by the request client and the auth flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport never produced a response (connect failure, DNS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered outside the 2xx range with a readable body.
    ///
    /// At the request layer `message` is the raw response text; the flow
    /// layer rewrites it per the endpoint's error-body convention.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    /// Server answered outside the 2xx range and the body was empty or
    /// unreadable.
    #[error("server returned status {status}")]
    ServerRejectedOpaque { status: u16 },

    /// Client-side precondition failed; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Operation called in a state that cannot support it (e.g. a profile
    /// mutation while logged out).
    #[error("{0}")]
    InvalidState(String),
}

impl AuthError {
    /// HTTP status of the rejection, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerRejected { status, .. } | Self::ServerRejectedOpaque { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Extract the `message` field from a JSON error body, falling back to the
/// given message when the body is not JSON or carries no `message`.
pub(crate) fn json_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_message_extracts_field() {
        let msg = json_message(r#"{"message":"invalid code"}"#, "fallback");
        assert_eq!(msg, "invalid code");
    }

    #[test]
    fn json_message_falls_back_on_plain_text() {
        assert_eq!(json_message("boom", "fallback"), "fallback");
    }

    #[test]
    fn json_message_falls_back_on_missing_field() {
        assert_eq!(json_message(r#"{"error":"x"}"#, "fallback"), "fallback");
    }

    #[test]
    fn status_is_exposed_for_rejections() {
        let err = AuthError::ServerRejected {
            status: 401,
            message: "no".into(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(AuthError::Validation("bad".into()).status(), None);
    }
}
