//! Shared HTTP client for the dashboard backend.
//!
//! Attaches the bearer token from an [`AuthProvider`] and a fresh
//! `X-Trace-Id` to every request, and normalizes failures into [`ApiError`].

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use invest_common::logging::generate_trace_id;
use invest_common::{ApiConfig, Error, Result};

use super::error::{ApiError, ErrorBody};

/// Header carrying the per-request trace ID.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Source of credentials for outgoing requests.
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Current bearer token, if any.
    fn access_token(&self) -> Option<String>;

    /// Called when a request that carried a token was rejected with 401.
    fn on_auth_failure(&self);
}

/// Provider for anonymous access.
#[derive(Debug, Default, Clone, Copy)]
pub struct Anonymous;

impl AuthProvider for Anonymous {
    fn access_token(&self) -> Option<String> {
        None
    }

    fn on_auth_failure(&self) {}
}

/// HTTP client bound to one backend base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ApiError> {
        self.execute(Method::GET, path, |req| req).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::POST, path, |req| req.json(body)).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> std::result::Result<T, ApiError> {
        self.execute(Method::POST, path, |req| req.form(fields)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        with_body: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> std::result::Result<T, ApiError> {
        let trace_id = generate_trace_id();
        let token = self.auth.access_token();

        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .header(ACCEPT, "application/json")
            .header(TRACE_ID_HEADER, &trace_id);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        let request = with_body(request);

        debug!(trace_id = %trace_id, method = %method, path, "API request");

        let response = request.send().await.map_err(|e| {
            warn!(trace_id = %trace_id, method = %method, path, error = %e, "API request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let err = ApiError::from_status(status.as_u16(), body.detail);
            warn!(
                trace_id = %trace_id,
                method = %method,
                path,
                status = status.as_u16(),
                error = %err,
                "API error response"
            );

            // A 401 without a token is a failed login, not an expired session.
            if matches!(err, ApiError::Unauthorized { .. }) && token.is_some() {
                self.auth.on_auth_failure();
            }
            return Err(err);
        }

        debug!(trace_id = %trace_id, status = status.as_u16(), "API response");

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
