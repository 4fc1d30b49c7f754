//! API client for the NYC360 REST API.
//!
//! `ApiClient` implements [`RemoteCaller`] for the interaction sites and
//! adds the account calls (login, token refresh, email confirmation and
//! password management) and the post read used by the command-line front end.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::Post;

use super::{routes, ApiError, Method, RemoteCaller};

// ============================================================================
// Constants
// ============================================================================

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.nyc360.com/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) reads.
/// Mutations are never retried.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Fallback message when a rejected envelope carries none
const DEFAULT_REJECTION: &str = "request was not successful";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    is_success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<EnvelopeError>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Access and refresh token returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Completes a reset with the token mailed by `forgot_password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// API client for NYC360.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method.into(), self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Unwrap the `{isSuccess, data, error}` envelope.
    ///
    /// Empty bodies are `Null`; bodies that are not an envelope are returned as-is.
    fn unwrap_envelope(body: &str) -> Result<Value, ApiError> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str::<Envelope>(body) {
            Ok(envelope) if envelope.is_success => Ok(envelope.data),
            Ok(envelope) => {
                let code = envelope.error.as_ref().and_then(|e| e.code.clone());
                let message = envelope
                    .error
                    .and_then(|e| e.message)
                    .or(envelope.message)
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
                debug!(code = ?code, "Request rejected by server");
                Err(ApiError::Rejected(message))
            }
            Err(_) => serde_json::from_str(body)
                .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e))),
        }
    }

    fn decode_data<T: DeserializeOwned>(data: Value, what: &str) -> Result<T> {
        serde_json::from_value(data).with_context(|| format!("Failed to parse {}", what))
    }

    /// GET with exponential backoff on 429.
    async fn get(&self, path: &str) -> Result<Value> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .request_builder(Method::Get, path)
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", path))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited.into());
                }
                warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let response = Self::check_response(response).await?;
            let body = response
                .text()
                .await
                .with_context(|| format!("Failed to read response from {}", path))?;
            return Ok(Self::unwrap_envelope(&body)?);
        }
    }

    // ===== Account =====

    /// Exchange email and password for a token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        let body = json!({ "email": email, "password": password });
        let data = self
            .request(Method::Post, routes::LOGIN, Some(body))
            .await
            .context("Login failed")?;
        Self::decode_data(data, "login response")
    }

    /// Exchange the current token pair for a fresh one.
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair> {
        let body = json!({ "accessToken": access_token, "refreshToken": refresh_token });
        let data = self
            .request(Method::Post, routes::REFRESH_TOKEN, Some(body))
            .await
            .context("Token refresh failed")?;
        Self::decode_data(data, "refresh response")
    }

    pub async fn confirm_email(&self, request: &ConfirmEmailRequest) -> Result<()> {
        self.post_account(routes::CONFIRM_EMAIL, request)
            .await
            .context("Email confirmation failed")
    }

    /// Ask the server to mail a password reset token.
    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<()> {
        self.post_account(routes::FORGOT_PASSWORD, request)
            .await
            .context("Password reset request failed")
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        self.post_account(routes::RESET_PASSWORD, request)
            .await
            .context("Password reset failed")
    }

    /// Change the password of the signed-in account. Needs a bearer token.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<()> {
        self.post_account(routes::CHANGE_PASSWORD, request)
            .await
            .context("Password change failed")
    }

    /// POST an account request whose reply carries no data.
    async fn post_account<T: Serialize>(&self, path: &str, request: &T) -> Result<()> {
        let body = serde_json::to_value(request).context("Failed to encode request")?;
        self.request(Method::Post, path, Some(body)).await?;
        Ok(())
    }

    // ===== Reads =====

    pub async fn fetch_post(&self, post_id: i64) -> Result<Post> {
        let data = self.get(&routes::post(post_id)).await?;
        Self::decode_data(data, "post")
    }
}

#[async_trait]
impl RemoteCaller for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut builder = self.request_builder(method, path);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        debug!(method = ?method, path = path, "Sending request");
        let response = Self::check_response(builder.send().await?).await?;
        let text = response.text().await?;
        Self::unwrap_envelope(&text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_envelope_success() {
        let data = ApiClient::unwrap_envelope(r#"{"isSuccess": true, "data": {"id": 3}, "error": null}"#)
            .expect("success envelope");
        assert_eq!(data, json!({"id": 3}));

        let no_data = ApiClient::unwrap_envelope(r#"{"isSuccess": true}"#).expect("no data");
        assert_eq!(no_data, Value::Null);

        assert_eq!(ApiClient::unwrap_envelope("").expect("empty"), Value::Null);
    }

    #[test]
    fn test_unwrap_envelope_rejection() {
        let err = ApiClient::unwrap_envelope(
            r#"{"isSuccess": false, "data": null, "error": {"code": "E1", "message": "Already joined"}}"#,
        )
        .expect_err("rejected envelope");
        assert!(matches!(err, ApiError::Rejected(msg) if msg == "Already joined"));

        let err = ApiClient::unwrap_envelope(r#"{"isSuccess": false, "message": "Nope"}"#)
            .expect_err("rejected envelope");
        assert!(matches!(err, ApiError::Rejected(msg) if msg == "Nope"));

        let err = ApiClient::unwrap_envelope(r#"{"isSuccess": false}"#).expect_err("rejected");
        assert!(matches!(err, ApiError::Rejected(msg) if msg == DEFAULT_REJECTION));
    }

    #[test]
    fn test_unwrap_envelope_passthrough_and_garbage() {
        let raw = ApiClient::unwrap_envelope(r#"[1, 2]"#).expect("raw json");
        assert_eq!(raw, json!([1, 2]));

        assert!(matches!(
            ApiClient::unwrap_envelope("<html>"),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_token_pair_parse() {
        let pair: TokenPair =
            serde_json::from_value(json!({"accessToken": "a", "refreshToken": "r"})).expect("pair");
        assert_eq!(pair.access_token, "a");
        assert_eq!(pair.refresh_token, "r");

        let access_only: TokenPair =
            serde_json::from_value(json!({"accessToken": "a"})).expect("access only");
        assert_eq!(access_only.refresh_token, "");
    }

    #[test]
    fn test_account_requests_use_wire_names() {
        let reset = ResetPasswordRequest {
            email: "ana@example.org".into(),
            token: "t0k".into(),
            new_password: "n3w".into(),
        };
        assert_eq!(
            serde_json::to_value(&reset).expect("encode"),
            json!({"email": "ana@example.org", "token": "t0k", "newPassword": "n3w"})
        );

        let change = ChangePasswordRequest {
            current_password: "old".into(),
            new_password: "new".into(),
        };
        assert_eq!(
            serde_json::to_value(&change).expect("encode"),
            json!({"currentPassword": "old", "newPassword": "new"})
        );

        let confirm = ConfirmEmailRequest {
            email: "ana@example.org".into(),
            token: "abc".into(),
        };
        assert_eq!(
            serde_json::to_value(&confirm).expect("encode"),
            json!({"email": "ana@example.org", "token": "abc"})
        );
    }

    #[test]
    fn test_account_routes() {
        let client = ApiClient::new("https://example.org/api").expect("client");
        assert_eq!(client.url(routes::CONFIRM_EMAIL), "https://example.org/api/auth/confirm-email");
        assert_eq!(client.url(routes::FORGOT_PASSWORD), "https://example.org/api/auth/forgot-password");
        assert_eq!(client.url(routes::RESET_PASSWORD), "https://example.org/api/auth/password-reset");
        assert_eq!(client.url(routes::CHANGE_PASSWORD), "https://example.org/api/auth/change-password");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("https://example.org/api/").expect("client");
        assert_eq!(client.url(routes::LOGIN), "https://example.org/api/auth/login");
    }
}
