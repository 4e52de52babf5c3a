//! AJAX helper: a plain GET against the service's `/ajax` endpoint.
//!
//! The page version wrapped `XMLHttpRequest` in a promise; this one wraps
//! `reqwest` in a `Result` with a bounded low-latency retry for transient
//! transport failures. The endpoint takes exactly one query pair and answers
//! with a JSON document.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

use crate::retry::{retry_async, RetryPolicy};
use crate::urls::Endpoints;

const ERROR_BODY_SNIPPET_LEN: usize = 220;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AjaxDefaults;

impl AjaxDefaults {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
    pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
}

#[derive(Clone, Debug)]
pub struct AjaxClientOptions {
    pub connect_timeout: Duration,
    pub attempt_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for AjaxClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: AjaxDefaults::CONNECT_TIMEOUT,
            attempt_timeout: AjaxDefaults::ATTEMPT_TIMEOUT,
            retry_policy: RetryPolicy::low_latency(),
        }
    }
}

/// HTTP client for the `/ajax` endpoint.
#[derive(Clone)]
pub struct AjaxClient {
    http: Client,
    endpoints: Endpoints,
    endpoint_override: Option<String>,
    auth_token: Option<SecretString>,
    attempt_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl AjaxClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, AjaxError> {
        Self::with_options(endpoints, AjaxClientOptions::default())
    }

    pub fn with_options(
        endpoints: Endpoints,
        options: AjaxClientOptions,
    ) -> Result<Self, AjaxError> {
        let http = Client::builder()
            .no_proxy()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(AjaxError::Transport)?;

        Ok(Self {
            http,
            endpoints,
            endpoint_override: None,
            auth_token: None,
            attempt_timeout: options.attempt_timeout,
            retry_policy: options.retry_policy,
        })
    }

    /// Sets an explicit AJAX endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into().trim_end().to_string());
        self
    }

    /// Attaches a bearer token to every request.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Fetches `/ajax?<param>=<value>` and decodes the JSON body.
    pub async fn get(&self, param: &str, value: &str) -> Result<Value, AjaxError> {
        let endpoint = self.endpoint();
        let policy = self.retry_policy.clone();

        retry_async(
            &policy,
            |_| {
                let endpoint = endpoint.clone();
                async move { self.send_attempt(&endpoint, param, value).await }
            },
            AjaxError::is_retryable,
        )
        .await
    }

    fn endpoint(&self) -> String {
        match self.endpoint_override.as_deref() {
            Some(endpoint) => endpoint.to_string(),
            None => self.endpoints.ajax(),
        }
    }

    async fn send_attempt(
        &self,
        endpoint: &str,
        param: &str,
        value: &str,
    ) -> Result<Value, AjaxError> {
        let mut builder = self
            .http
            .get(endpoint)
            .query(&[(param, value)])
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.attempt_timeout);

        if let Some(token) = self.auth_token.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(AjaxError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(AjaxError::Transport)?;

        if !status.is_success() {
            return Err(AjaxError::HttpStatus {
                status,
                body: summarize_error_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(AjaxError::Parse)
    }
}

#[derive(Debug, Error)]
pub enum AjaxError {
    #[error("ajax request failed: {0}")]
    Transport(reqwest::Error),

    #[error("http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("failed to parse response json: {0}")]
    Parse(serde_json::Error),
}

impl AjaxError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Parse(_) => false,
        }
    }
}

fn summarize_error_body(body: &str) -> String {
    #[derive(Debug, serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        reason: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message).or(parsed.reason) {
            return message;
        }
    }

    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}
