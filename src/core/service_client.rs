// src/core/service_client.rs
//! HTTP client for the extraction queue endpoints

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::ApiError;
use crate::types::{DuplicateInfo, EnqueueOutcome, EnqueueRequest, QueueItem, QueueSnapshot};

pub const QUEUE_ENDPOINT: &str = "/api/extraction/queue";
pub const WATCH_ENDPOINT: &str = "/api/extraction/queue/watch";
pub const ENQUEUE_ENDPOINT: &str = "/api/extraction/queue";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Queue server operations used by the watcher and the CLI
#[async_trait]
pub trait QueueApi: Send + Sync + 'static {
    /// One-shot snapshot of the queue
    async fn fetch_queue(&self, token: &str) -> Result<Vec<QueueItem>, ApiError>;

    /// Long-poll: resolves once the server reports a change or its own
    /// timeout elapses. Dropping the future aborts the connection.
    async fn watch_queue(&self, token: &str) -> Result<Vec<QueueItem>, ApiError>;

    async fn enqueue(
        &self,
        token: &str,
        request: &EnqueueRequest,
    ) -> Result<EnqueueOutcome, ApiError>;
}

pub struct QueueClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl QueueClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// `request_timeout` bounds snapshot and enqueue calls; the long-poll
    /// request is never given a client-side timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn read_snapshot(response: reqwest::Response) -> Result<Vec<QueueItem>, ApiError> {
        let status = response.status();
        trace!("Queue response status: {}", status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let snapshot: QueueSnapshot = serde_json::from_str(&body)?;
        Ok(snapshot.queue)
    }
}

#[async_trait]
impl QueueApi for QueueClient {
    async fn fetch_queue(&self, token: &str) -> Result<Vec<QueueItem>, ApiError> {
        let url = self.url(QUEUE_ENDPOINT);
        debug!("Fetching queue snapshot: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::read_snapshot(response).await
    }

    async fn watch_queue(&self, token: &str) -> Result<Vec<QueueItem>, ApiError> {
        let url = self.url(WATCH_ENDPOINT);
        debug!("Opening long-poll: {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        Self::read_snapshot(response).await
    }

    async fn enqueue(
        &self,
        token: &str,
        request: &EnqueueRequest,
    ) -> Result<EnqueueOutcome, ApiError> {
        let url = self.url(ENQUEUE_ENDPOINT);
        debug!("Enqueueing {} (priority {})", request.url, request.priority);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await?;

        if status == StatusCode::CONFLICT {
            match serde_json::from_str::<DuplicateInfo>(&body) {
                Ok(duplicate) if duplicate.is_duplicate => {
                    return Ok(EnqueueOutcome::Duplicate(duplicate));
                }
                Ok(_) | Err(_) => {
                    warn!("409 from enqueue without a duplicate payload: {}", body);
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body)?
        };

        Ok(EnqueueOutcome::Queued(value))
    }
}
