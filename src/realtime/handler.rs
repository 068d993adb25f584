//! Alert Stream Handler
//!
//! Accepts `GET /api/v1/alerts/stream` and holds the response open as a
//! text/event-stream for the authenticated user.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;

use super::channel::SseChannel;
use super::frame;
use super::hub::Channel;
use super::stream::{event_stream, ConnectionGuard};
use crate::api::error::{ApiError, ApiResult};
use crate::api::identity::UserId;
use crate::api::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// SSE upgrade handler
///
/// Registers a fresh channel under the caller's identity. The connection
/// stays open until the client disconnects or the channel is closed.
pub async fn alert_stream_handler(
    State(state): State<Arc<AppState>>,
    user: UserId,
) -> ApiResult<Response> {
    let realtime = &state.config.realtime;

    let open = state.hub.channel_count(user.as_str());
    if open >= realtime.max_channels_per_user {
        tracing::warn!(user_id = %user, open, "Alert stream limit reached");
        return Err(ApiError::TooManyConnections(realtime.max_channels_per_user));
    }

    let (channel, rx) = SseChannel::new(realtime.channel_capacity);
    let channel = Arc::new(channel);

    // Queued ahead of any event so the client sees the stream as open
    if let Err(e) = channel.write(&frame::comment("connected")) {
        return Err(ApiError::Internal(format!("Failed to open alert stream: {}", e)));
    }

    let subscription = state.hub.subscribe(user.as_str(), channel.clone());
    let guard = ConnectionGuard::new(subscription, channel);
    let keep_alive = Duration::from_secs(realtime.keep_alive_secs.max(1));
    let body = Body::from_stream(event_stream(rx, guard, keep_alive));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-transform"),
            ),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        body,
    )
        .into_response())
}
