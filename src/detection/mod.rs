//! Anomaly Detection
//!
//! Types exchanged with the external detection service and the alert payload
//! pushed to dashboards.
//!
//! The model itself runs elsewhere; [`Detector`] is the seam the API layer
//! calls through, with [`DetectorClient`] as the HTTP implementation.

mod client;

pub use client::DetectorClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event name used for anomaly alerts on the alert stream
pub const ALERT_EVENT: &str = "alert";

/// Label reported for frames with nothing detected
pub const NORMAL_CLASS: &str = "Normal";

/// Classes the detection model is trained on
pub const DETECTION_CLASSES: [&str; 14] = [
    "Abuse",
    "Arrest",
    "Arson",
    "Assault",
    "Burglary",
    "Explosion",
    "Fighting",
    "Normal_Videos_for_Event_Recognition",
    "RoadAccidents",
    "Robbery",
    "Shooting",
    "Shoplifting",
    "Stealing",
    "Vandalism",
];

/// Whether `label` is one the model can produce
pub fn is_known_class(label: &str) -> bool {
    label == NORMAL_CLASS || DETECTION_CLASSES.contains(&label)
}

/// Common interface for detection backends
#[async_trait]
pub trait Detector: Send + Sync {
    /// Classify a single frame
    async fn detect_frame(&self, request: &FrameRequest) -> Result<FrameDetection, DetectorError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<(), DetectorError>;
}

/// A frame submitted for classification
#[derive(Debug, Clone)]
pub struct FrameRequest {
    /// Camera identifier as known to the dashboard
    pub camera_id: String,
    /// Image as a `data:image/...;base64,` URI
    pub frame_data: String,
    /// Capture time, defaults to now
    pub timestamp: Option<DateTime<Utc>>,
}

/// Classification returned by the detection service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetection {
    #[serde(default)]
    pub is_anomaly: bool,

    #[serde(default = "default_class")]
    pub detected_class: String,

    #[serde(default = "default_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Bounding box `[x, y, width, height]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    /// Backend-specific details (model version, timings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Set when the result is a fallback rather than a real classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_class() -> String {
    NORMAL_CLASS.to_string()
}

fn default_confidence() -> f64 {
    0.5
}

impl FrameDetection {
    /// Result used when the detection service cannot be reached.
    ///
    /// Never an anomaly, so an outage cannot raise alerts.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            is_anomaly: false,
            detected_class: default_class(),
            confidence: default_confidence(),
            timestamp: Some(Utc::now()),
            bbox: None,
            details: Some(serde_json::json!({
                "final_confidence": default_confidence(),
                "processing_time": 0,
                "model_version": "fallback",
            })),
            error: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Alert severity derived from model confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Severity::Critical
        } else if confidence >= 0.75 {
            Severity::High
        } else if confidence >= 0.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Payload of an `alert` event on the alert stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub camera_id: String,
    pub detected_class: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl AlertPayload {
    pub fn new(
        camera_id: impl Into<String>,
        detected_class: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            detected_class: detected_class.into(),
            confidence,
            timestamp,
            severity: Severity::from_confidence(confidence),
            bbox: None,
        }
    }

    pub fn bbox(mut self, bbox: Option<[f64; 4]>) -> Self {
        self.bbox = bbox;
        self
    }
}

/// Whether a detection is strong enough to alert on
pub fn should_alert(is_anomaly: bool, confidence: f64, threshold: f64) -> bool {
    is_anomaly && confidence.is_finite() && confidence >= threshold
}

/// Numeric camera id expected by the detection service.
///
/// Keeps the last six digits of the dashboard id; ids without digits (or
/// all zeros) map to 1.
pub fn numeric_camera_id(camera_id: &str) -> u32 {
    let digits: Vec<char> = camera_id.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(6)..].iter().collect();
    match tail.parse::<u32>() {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    }
}

/// Errors that can occur when talking to the detection service
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detection service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Detection service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_camera_id() {
        assert_eq!(numeric_camera_id("65f1c2a9e4b0123456789abc"), 456789);
        assert_eq!(numeric_camera_id("cam-42"), 42);
        assert_eq!(numeric_camera_id("screen-share-default"), 1);
        assert_eq!(numeric_camera_id("cam-000"), 1);
        assert_eq!(numeric_camera_id(""), 1);
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_confidence(0.95), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.9), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.8), Severity::High);
        assert_eq!(Severity::from_confidence(0.5), Severity::Medium);
        assert_eq!(Severity::from_confidence(0.2), Severity::Low);
    }

    #[test]
    fn test_should_alert() {
        assert!(should_alert(true, 0.5, 0.5));
        assert!(!should_alert(true, 0.49, 0.5));
        assert!(!should_alert(false, 0.99, 0.5));
        assert!(!should_alert(true, f64::NAN, 0.5));
    }

    #[test]
    fn test_detection_defaults_when_fields_missing() {
        let detection: FrameDetection = serde_json::from_value(json!({"camera_id": 3})).unwrap();
        assert!(!detection.is_anomaly);
        assert_eq!(detection.detected_class, NORMAL_CLASS);
        assert_eq!(detection.confidence, 0.5);
        assert!(!detection.is_fallback());
    }

    #[test]
    fn test_fallback_never_alerts() {
        let detection = FrameDetection::fallback("connection refused");
        assert!(detection.is_fallback());
        assert!(!should_alert(detection.is_anomaly, detection.confidence, 0.0));
        assert_eq!(detection.details.unwrap()["model_version"], "fallback");
    }

    #[test]
    fn test_alert_payload_serialization() {
        let timestamp = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let payload = AlertPayload::new("cam-1", "Fighting", 0.92, timestamp);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "camera_id": "cam-1",
                "detected_class": "Fighting",
                "confidence": 0.92,
                "timestamp": "2026-03-01T12:00:00Z",
                "severity": "critical",
            })
        );
    }

    #[test]
    fn test_known_classes() {
        assert!(is_known_class("Vandalism"));
        assert!(is_known_class(NORMAL_CLASS));
        assert!(!is_known_class("vandalism"));
    }
}
