//! Detection Routes
//!
//! Endpoints that record detection results and raise alerts.
//!
//! - POST /api/v1/detect/frame - Classify a frame via the detection service
//! - POST /api/v1/detections - Record a detection computed elsewhere
//!
//! Alerts are published only after the detection result is final, and the
//! publish can never fail the request.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{
    DetectFrameRequest, DetectFrameResponse, ReportDetectionRequest, ReportDetectionResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::identity::UserId;
use crate::api::state::AppState;
use crate::detection::{
    is_known_class, should_alert, AlertPayload, FrameDetection, FrameRequest, ALERT_EVENT,
};

const MAX_CAMERA_ID_LEN: usize = 64;

/// POST /api/v1/detect/frame
///
/// Classify a single frame. Falls back to a non-anomalous result if the
/// detection service is unreachable.
pub async fn detect_frame(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Json(req): Json<DetectFrameRequest>,
) -> ApiResult<Json<DetectFrameResponse>> {
    validate_camera_id(&req.camera_id)?;

    if !req.frame_data.starts_with("data:image/") {
        return Err(ApiError::Validation(
            "frame_data must be a data:image/ URI".to_string(),
        ));
    }

    let frame_time_sec = req.frame_time_sec.unwrap_or(0.0);
    if !frame_time_sec.is_finite() || frame_time_sec < 0.0 {
        return Err(ApiError::Validation(
            "frame_time_sec must be a non-negative number".to_string(),
        ));
    }

    let frame = FrameRequest {
        camera_id: req.camera_id.clone(),
        frame_data: req.frame_data,
        timestamp: req.timestamp,
    };

    let detection = match state.detector.detect_frame(&frame).await {
        Ok(detection) => detection,
        Err(e) => {
            tracing::warn!(
                camera_id = %frame.camera_id,
                error = %e,
                "Detection service call failed, using fallback"
            );
            FrameDetection::fallback(format!("Detection service unavailable: {}", e))
        }
    };

    let timestamp = detection
        .timestamp
        .or(req.timestamp)
        .unwrap_or_else(Utc::now);

    let alert = AlertPayload::new(
        req.camera_id.as_str(),
        detection.detected_class.as_str(),
        detection.confidence,
        timestamp,
    )
    .bbox(detection.bbox);
    let alerted = raise_alert(&state, &user, detection.is_anomaly, alert);

    Ok(Json(DetectFrameResponse {
        camera_id: req.camera_id,
        frame_time_sec,
        timestamp,
        is_anomaly: detection.is_anomaly,
        detected_class: detection.detected_class.clone(),
        confidence: detection.confidence,
        alerted,
        external_api_response: detection,
    }))
}

/// POST /api/v1/detections
///
/// Record a detection produced by another pipeline.
pub async fn report_detection(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Json(req): Json<ReportDetectionRequest>,
) -> ApiResult<(StatusCode, Json<ReportDetectionResponse>)> {
    validate_report(&req)?;

    if !is_known_class(&req.detected_class) {
        tracing::debug!(detected_class = %req.detected_class, "Unrecognized detection class");
    }

    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    let alert = AlertPayload::new(req.camera_id, req.detected_class, req.confidence, timestamp)
        .bbox(req.bbox);
    let alerted = raise_alert(&state, &user, req.is_anomaly, alert);

    Ok((StatusCode::ACCEPTED, Json(ReportDetectionResponse { alerted })))
}

/// Publish `alert` to the user's open streams if the detection qualifies
fn raise_alert(state: &AppState, user: &UserId, is_anomaly: bool, alert: AlertPayload) -> bool {
    let threshold = state.config.detector.confidence_threshold;
    if !should_alert(is_anomaly, alert.confidence, threshold) {
        return false;
    }

    state.hub.publish(user.as_str(), ALERT_EVENT, &alert);

    tracing::info!(
        user_id = %user,
        camera_id = %alert.camera_id,
        detected_class = %alert.detected_class,
        confidence = alert.confidence,
        severity = ?alert.severity,
        "Anomaly alert raised"
    );
    true
}

fn validate_camera_id(camera_id: &str) -> ApiResult<()> {
    if camera_id.trim().is_empty() {
        return Err(ApiError::Validation("camera_id cannot be empty".to_string()));
    }
    if camera_id.len() > MAX_CAMERA_ID_LEN {
        return Err(ApiError::Validation(format!(
            "camera_id exceeds maximum length of {} characters",
            MAX_CAMERA_ID_LEN
        )));
    }
    Ok(())
}

fn validate_report(req: &ReportDetectionRequest) -> ApiResult<()> {
    validate_camera_id(&req.camera_id)?;

    if req.detected_class.trim().is_empty() {
        return Err(ApiError::Validation(
            "detected_class cannot be empty".to_string(),
        ));
    }

    if !req.confidence.is_finite() || !(0.0..=1.0).contains(&req.confidence) {
        return Err(ApiError::Validation(
            "confidence must be between 0 and 1".to_string(),
        ));
    }

    if let Some(bbox) = req.bbox {
        if bbox.iter().any(|v| !v.is_finite()) {
            return Err(ApiError::Validation(
                "bbox values must be finite numbers".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(confidence: f64) -> ReportDetectionRequest {
        ReportDetectionRequest {
            camera_id: "cam-1".to_string(),
            detected_class: "Robbery".to_string(),
            confidence,
            is_anomaly: true,
            timestamp: None,
            bbox: None,
        }
    }

    #[test]
    fn test_validate_report_valid() {
        assert!(validate_report(&report(0.8)).is_ok());
        assert!(validate_report(&report(0.0)).is_ok());
        assert!(validate_report(&report(1.0)).is_ok());
    }

    #[test]
    fn test_validate_report_confidence_range() {
        assert!(validate_report(&report(1.5)).is_err());
        assert!(validate_report(&report(-0.1)).is_err());
        assert!(validate_report(&report(f64::NAN)).is_err());
    }

    #[test]
    fn test_validate_report_bbox() {
        let mut req = report(0.8);
        req.bbox = Some([0.0, 1.0, f64::INFINITY, 2.0]);
        assert!(validate_report(&req).is_err());
    }

    #[test]
    fn test_validate_camera_id() {
        assert!(validate_camera_id("cam-1").is_ok());
        assert!(validate_camera_id("   ").is_err());
        assert!(validate_camera_id(&"c".repeat(MAX_CAMERA_ID_LEN + 1)).is_err());
    }
}
