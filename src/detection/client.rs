//! Detection Service REST Client
//!
//! HTTP client for the external anomaly detection service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{numeric_camera_id, Detector, DetectorError, FrameDetection, FrameRequest};
use crate::config::DetectorConfig;

/// Detection service REST API client
pub struct DetectorClient {
    client: Client,
    config: DetectorConfig,
}

impl DetectorClient {
    /// Create a new client with the given configuration
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send a POST request with retry logic.
    ///
    /// Connection failures, timeouts and 5xx responses are retried; other
    /// error statuses fail immediately.
    async fn send_post<T: Serialize>(&self, url: &str, body: &T) -> Result<Response, DetectorError> {
        let mut last_error = DetectorError::Unavailable;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Backoff: 250ms, 1s, 2.25s...
                let delay = Duration::from_millis(250 * u64::from(attempt).pow(2));
                tokio::time::sleep(delay).await;
            }

            match self.authorize(self.client.post(url)).json(body).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    let error = DetectorError::Api {
                        status,
                        message: error_detail(&text),
                    };
                    if status < 500 {
                        return Err(error);
                    }
                    tracing::debug!(url = %url, attempt, status, "Detection service error, retrying");
                    last_error = error;
                }
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "Detection request failed");
                    last_error = classify(e);
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Detector for DetectorClient {
    async fn detect_frame(&self, request: &FrameRequest) -> Result<FrameDetection, DetectorError> {
        let url = self.url("/api/detect/frame");
        let timestamp = request.timestamp.unwrap_or_else(Utc::now);

        let body = DetectFrameRequest {
            camera_id: numeric_camera_id(&request.camera_id),
            frame_data: &request.frame_data,
            timestamp,
        };

        let response = self.send_post(&url, &body).await?;
        let mut detection: FrameDetection = response.json().await.map_err(DetectorError::Request)?;
        detection.timestamp.get_or_insert(timestamp);

        tracing::debug!(
            camera_id = %request.camera_id,
            is_anomaly = detection.is_anomaly,
            detected_class = %detection.detected_class,
            confidence = detection.confidence,
            "Frame classified"
        );

        Ok(detection)
    }

    async fn health_check(&self) -> Result<(), DetectorError> {
        let response = self
            .authorize(self.client.get(self.url("/health")))
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DetectorError::Unavailable)
        }
    }
}

fn classify(e: reqwest::Error) -> DetectorError {
    if e.is_timeout() {
        DetectorError::Timeout
    } else if e.is_connect() {
        DetectorError::Unavailable
    } else {
        DetectorError::Request(e)
    }
}

/// Extract `detail` from a FastAPI-style error body, else use the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            }
        })
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
struct DetectFrameRequest<'a> {
    camera_id: u32,
    frame_data: &'a str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}
