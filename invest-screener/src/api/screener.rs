//! Screening endpoints.

use async_trait::async_trait;
use tracing::debug;

use super::client::ApiClient;
use super::error::ApiError;
use crate::model::{ScreenerOptions, ScreenerQueryRequest, ScreenerResponse};

/// Backend operations the screener depends on.
///
/// Cancellation is the caller's job: dropping the returned future abandons
/// the request.
#[async_trait]
pub trait ScreeningService: Send + Sync {
    /// `POST /screener/`
    async fn screen_stocks(&self, request: &ScreenerQueryRequest) -> Result<ScreenerResponse, ApiError>;

    /// `GET /screener/options`
    async fn fetch_options(&self) -> Result<ScreenerOptions, ApiError>;
}

/// [`ScreeningService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScreeningService {
    client: ApiClient,
}

impl HttpScreeningService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScreeningService for HttpScreeningService {
    async fn screen_stocks(&self, request: &ScreenerQueryRequest) -> Result<ScreenerResponse, ApiError> {
        let response: ScreenerResponse = self.client.post_json("/screener/", request).await?;
        debug!(
            rows = response.results.len(),
            total = response.total_count,
            "Screener query returned"
        );
        Ok(response)
    }

    async fn fetch_options(&self) -> Result<ScreenerOptions, ApiError> {
        self.client.get_json("/screener/options").await
    }
}
