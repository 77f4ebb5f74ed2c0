//! Generic JSON request helper.
//!
//! Performs GET/POST/PUT/DELETE against the configured base address and
//! normalizes every expected outcome into `Result<Value, AuthError>`:
//! - transport failure (connect error, timeout) → `AuthError::Network`
//! - non-2xx → `AuthError::ServerRejected` carrying the raw body text,
//!   or `ServerRejectedOpaque` when the body is empty/unreadable
//! - 2xx with an empty or non-JSON body → `Value::Null` (success marker)
//!
//! The credential header is derived from [`CredentialProvider`] on every
//! call, never cached. This layer has no knowledge of the session store.

use reqwest::{header, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AuthConfig, CredentialMode};
use crate::credentials::CredentialProvider;
use crate::error::AuthError;

/// HTTP helper bound to one server base address.
pub struct RequestClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Arc<CredentialProvider>,
}

impl RequestClient {
    /// Build the client. Cookie-mode deployments get a cookie jar so the
    /// session cookie set by the verify endpoints is replayed on later
    /// calls; bearer-mode deployments rely on `credentials` instead.
    pub fn new(config: &AuthConfig, credentials: Arc<CredentialProvider>) -> Result<Self, AuthError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.credential_mode == CredentialMode::Cookie {
            builder = builder.cookie_store(true);
        }
        let http = builder.build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            credentials,
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, AuthError> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, AuthError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, AuthError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, AuthError> {
        self.execute(Method::DELETE, path, None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AuthError> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(header::CONTENT_TYPE, "application/json");

        // Computed fresh on every call so a token rotated between calls
        // is honored immediately.
        if let Some(token) = self.credentials.read() {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            return match resp.text().await {
                Ok(body) if !body.trim().is_empty() => Err(AuthError::ServerRejected {
                    status: status.as_u16(),
                    message: body,
                }),
                _ => Err(AuthError::ServerRejectedOpaque {
                    status: status.as_u16(),
                }),
            };
        }

        let body = resp.text().await.unwrap_or_default();
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        // A 2xx with a non-JSON body means the endpoint declares no
        // payload; that is a success, not a parse failure.
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RequestClient {
        RequestClient::new(
            &AuthConfig::new(server.uri()),
            Arc::new(CredentialProvider::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_returns_parsed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
            .mount(&server)
            .await;

        let value = client_for(&server).get("/user/get").await.unwrap();
        assert_eq!(value["username"], "alice");
    }

    #[tokio::test]
    async fn post_serializes_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"email": "a@x.com"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .post("/auth/login", json!({"email": "a@x.com"}))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn put_serializes_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/thing"))
            .and(body_json(json!({"k": "v"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let value = client_for(&server).put("/thing", json!({"k": "v"})).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn empty_success_body_is_a_marker_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).delete("/thing").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).get("/plain").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn non_2xx_carries_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .respond_with(ResponseTemplate::new(401).set_body_string("code expired"))
            .mount(&server)
            .await;

        let err = client_for(&server).get("/user/get").await.unwrap_err();
        match err {
            AuthError::ServerRejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "code expired");
            }
            other => panic!("expected ServerRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_with_empty_body_is_opaque() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).get("/user/get").await.unwrap_err();
        assert!(matches!(err, AuthError::ServerRejectedOpaque { status: 500 }));
    }

    #[tokio::test]
    async fn transport_failure_is_network() {
        // Nothing listens on this port.
        let credentials = Arc::new(CredentialProvider::new());
        let client =
            RequestClient::new(&AuthConfig::new("http://127.0.0.1:9"), credentials).unwrap();

        let err = client.get("/user/get").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }

    #[tokio::test]
    async fn bearer_token_is_read_fresh_on_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"seen": 1})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .and(header("authorization", "Bearer tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"seen": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Arc::new(CredentialProvider::new());
        let client = RequestClient::new(
            &AuthConfig::new(server.uri()).credential_mode(CredentialMode::Bearer),
            credentials.clone(),
        )
        .unwrap();

        credentials.write("tok-1");
        assert_eq!(client.get("/user/get").await.unwrap()["seen"], 1);

        // Rotate between calls; the new token must be honored immediately.
        credentials.write("tok-2");
        assert_eq!(client.get("/user/get").await.unwrap()["seen"], 2);
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = RequestClient::new(
            &AuthConfig::new(format!("{}/", server.uri())),
            Arc::new(CredentialProvider::new()),
        )
        .unwrap();
        assert!(client.get("/user/get").await.is_ok());
    }
}
