//! Backend REST Client
//!
//! One method per backend capability. Each call is a single round trip
//! with a JSON content type; there is no retry or backoff here.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::{ApiResult, RequestFailed};
use super::types::{
    ChatReply, ChatRequest, CrisisDistrict, FilterOptions, HealthStatus, MetricsSummary,
    StateRanking,
};
use crate::config::ApiConfig;

pub const HEALTH: &str = "/health";
pub const METRICS: &str = "/api/dashboard/metrics";
pub const STATES: &str = "/api/dashboard/states";
pub const CRISIS_DISTRICTS: &str = "/api/dashboard/crisis-districts";
pub const FILTERS: &str = "/api/dashboard/filters";
pub const CHAT: &str = "/api/chat/";

pub const DEFAULT_STATES_LIMIT: usize = 20;
pub const DEFAULT_CRISIS_LIMIT: usize = 30;

/// The backend capabilities the dashboard and chat depend on.
///
/// [`ApiClient`] is the HTTP implementation; tests substitute their own.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn check_health(&self) -> ApiResult<HealthStatus>;

    async fn metrics(&self) -> ApiResult<MetricsSummary>;

    /// State rankings in backend rank order
    async fn states(&self, limit: usize) -> ApiResult<Vec<StateRanking>>;

    async fn crisis_districts(&self, limit: usize) -> ApiResult<Vec<CrisisDistrict>>;

    async fn filters(&self) -> ApiResult<FilterOptions>;

    /// Submit a question to the backend assistant
    async fn ask(&self, question: &str) -> ApiResult<ChatReply>;
}

/// HTTP client for the analytics backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client. `timeout` of `None` lets requests run until the
    /// server answers or the connection drops.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> reqwest::Result<Self> {
        // Every request carries the JSON content type, bodies or not
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> reqwest::Result<Self> {
        Self::new(
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Send a prepared request and decode the JSON body
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let result = self.send(endpoint, request).await;
        if let Err(e) = &result {
            tracing::error!(endpoint = %endpoint, status = ?e.status, error = %e, "API error");
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RequestFailed::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailed::status(endpoint, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RequestFailed::transport(endpoint, e))?;

        serde_json::from_str(&body).map_err(|e| RequestFailed::decode(endpoint, status.as_u16(), e))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let mut request = self.client.get(self.url(endpoint));
        if !query.is_empty() {
            request = request.query(query);
        }
        self.fetch(endpoint, request).await
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn check_health(&self) -> ApiResult<HealthStatus> {
        self.get(HEALTH, &[]).await
    }

    async fn metrics(&self) -> ApiResult<MetricsSummary> {
        self.get(METRICS, &[]).await
    }

    async fn states(&self, limit: usize) -> ApiResult<Vec<StateRanking>> {
        self.get(STATES, &[("limit", limit.to_string())]).await
    }

    async fn crisis_districts(&self, limit: usize) -> ApiResult<Vec<CrisisDistrict>> {
        self.get(CRISIS_DISTRICTS, &[("limit", limit.to_string())]).await
    }

    async fn filters(&self) -> ApiResult<FilterOptions> {
        self.get(FILTERS, &[]).await
    }

    async fn ask(&self, question: &str) -> ApiResult<ChatReply> {
        let request = self.client.post(self.url(CHAT)).json(&ChatRequest {
            question: question.to_string(),
        });
        self.fetch(CHAT, request).await
    }
}
