//! Realtime Alert Distribution
//!
//! Pushes anomaly alerts to dashboards over Server-Sent Events.
//!
//! ## Architecture
//!
//! - **EventHub**: registry of open channels per user; `subscribe`/`publish`
//! - **SseChannel**: bounded queue feeding one SSE response body
//! - **Stream**: body stream with idle keep-alive and teardown on disconnect
//! - **Handler**: `GET /api/v1/alerts/stream`
//!
//! Delivery is best-effort and process-local: events published while a client
//! is disconnected are not replayed, and a second server instance has its own
//! independent hub.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const source = new EventSource('/api/v1/alerts/stream', { withCredentials: true });
//!
//! source.addEventListener('alert', (event) => {
//!   const alert = JSON.parse(event.data);
//!   console.log(alert.camera_id, alert.detected_class, alert.confidence);
//! });
//! ```

mod channel;
pub mod frame;
mod handler;
mod hub;
mod stream;

pub use channel::{ChannelState, SseChannel};
pub use frame::FrameError;
pub use handler::alert_stream_handler;
pub use hub::{Channel, ChannelError, EventHub, SubscriberKey, Subscription};
pub use stream::{event_stream, ConnectionGuard};
