//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::FrameDetection;

// ============================================
// DETECTION DTOs
// ============================================

/// Frame classification request
#[derive(Debug, Deserialize)]
pub struct DetectFrameRequest {
    /// Camera the frame was captured from
    pub camera_id: String,
    /// Image as a `data:image/...` URI
    pub frame_data: String,
    /// Optional capture time, defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Offset into an uploaded video, in seconds
    #[serde(default, alias = "frameTimeSec")]
    pub frame_time_sec: Option<f64>,
}

/// Frame classification response
#[derive(Debug, Serialize)]
pub struct DetectFrameResponse {
    pub camera_id: String,
    pub frame_time_sec: f64,
    pub timestamp: DateTime<Utc>,
    pub is_anomaly: bool,
    pub detected_class: String,
    pub confidence: f64,
    /// Whether an alert was pushed to the caller's open streams
    pub alerted: bool,
    /// Raw detection service result
    pub external_api_response: FrameDetection,
}

/// Detection computed elsewhere (e.g. the video pipeline)
#[derive(Debug, Deserialize)]
pub struct ReportDetectionRequest {
    pub camera_id: String,
    pub detected_class: String,
    pub confidence: f64,
    pub is_anomaly: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Bounding box `[x, y, width, height]`
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

/// Detection report response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportDetectionResponse {
    /// Whether an alert was pushed to the caller's open streams
    pub alerted: bool,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// Detection service status: "ok" or "unavailable"
    pub detector: String,
    pub realtime: RealtimeStats,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Alert hub occupancy
#[derive(Debug, Serialize)]
pub struct RealtimeStats {
    /// Users with at least one open stream
    pub subscribers: usize,
    /// Open streams across all users
    pub channels: usize,
}
