//! # Campus Sentinel
//!
//! Realtime anomaly alert distribution for campus security camera dashboards.
//!
//! Detections come in over HTTP, either classified here through the external
//! detection service or reported by another pipeline. Anomalies that clear
//! the confidence threshold are pushed, as Server-Sent Events, to every
//! dashboard tab the owning user has open.
//!
//! ## Modules
//!
//! - [`realtime`]: Per-user event hub and the SSE transport
//! - [`detection`]: Detection service client and alert payloads
//! - [`api`]: REST API server with Axum
//! - [`config`]: File and environment configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use campus_sentinel::realtime::{EventHub, SseChannel};
//! use std::sync::Arc;
//!
//! let hub = EventHub::new();
//! let (channel, mut rx) = SseChannel::new(8);
//! let subscription = hub.subscribe("user-1", Arc::new(channel));
//!
//! hub.publish("user-1", "alert", &serde_json::json!({ "camera_id": "cam-1" }));
//! let frame = rx.try_recv().unwrap();
//! assert!(frame.starts_with(b"event: alert\n"));
//!
//! subscription.unsubscribe();
//! assert_eq!(hub.channel_count("user-1"), 0);
//! ```

pub mod api;
pub mod config;
pub mod detection;
pub mod realtime;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, DetectorConfig, LoggingConfig, RealtimeConfig, ServerConfig};

pub use detection::{AlertPayload, Detector, DetectorClient, DetectorError, FrameDetection, Severity};

pub use realtime::{Channel, ChannelError, EventHub, SseChannel, Subscription};
