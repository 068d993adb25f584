//! SSE Body Stream
//!
//! Drains an [`SseChannel`] queue into response body chunks and interleaves
//! keep-alive comments while the connection is idle.

use axum::body::Bytes;
use chrono::Utc;
use futures_util::{stream, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::channel::SseChannel;
use super::frame;
use super::hub::{Channel, Subscription};

/// Ties a hub subscription to the lifetime of the response body.
///
/// When the client disconnects the body is dropped, which drops the guard:
/// the channel is unsubscribed and closed. Both steps are idempotent, so it
/// is fine if the hub already pruned the channel after a failed write.
pub struct ConnectionGuard {
    subscription: Subscription,
    channel: Arc<SseChannel>,
}

impl ConnectionGuard {
    pub fn new(subscription: Subscription, channel: Arc<SseChannel>) -> Self {
        Self {
            subscription,
            channel,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        self.channel.close();
    }
}

struct StreamState {
    rx: mpsc::Receiver<Bytes>,
    keep_alive: Interval,
    _guard: ConnectionGuard,
}

/// Build the body stream for one connection.
///
/// Ends when the channel is closed and its queue drained.
pub fn event_stream(
    rx: mpsc::Receiver<Bytes>,
    guard: ConnectionGuard,
    keep_alive: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let mut keep_alive = time::interval_at(Instant::now() + keep_alive, keep_alive);
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = StreamState {
        rx,
        keep_alive,
        _guard: guard,
    };

    stream::unfold(state, |mut state| async move {
        let chunk = tokio::select! {
            queued = state.rx.recv() => {
                let queued = queued?;
                state.keep_alive.reset();
                queued
            }
            _ = state.keep_alive.tick() => {
                let ping = format!("ping {}", Utc::now().timestamp_millis());
                Bytes::from(frame::comment(&ping))
            }
        };
        Some((Ok(chunk), state))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::hub::EventHub;
    use futures_util::StreamExt;
    use serde_json::json;

    fn connect(
        hub: &EventHub,
        key: &str,
        keep_alive: Duration,
    ) -> (Arc<SseChannel>, impl Stream<Item = Result<Bytes, Infallible>>) {
        let (channel, rx) = SseChannel::new(8);
        let channel = Arc::new(channel);
        let subscription = hub.subscribe(key, channel.clone());
        let guard = ConnectionGuard::new(subscription, channel.clone());
        (channel, event_stream(rx, guard, keep_alive))
    }

    fn text(chunk: Option<Result<Bytes, Infallible>>) -> String {
        let bytes = chunk.expect("stream ended").unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_published_event_reaches_stream() {
        let hub = EventHub::new();
        let (_channel, stream) = connect(&hub, "u1", Duration::from_secs(15));
        tokio::pin!(stream);

        hub.publish("u1", "alert", &json!({"x": 1}));
        assert_eq!(text(stream.next().await), "event: alert\ndata: {\"x\":1}\n\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_stream_sends_keep_alive() {
        let hub = EventHub::new();
        let (_channel, stream) = connect(&hub, "u1", Duration::from_secs(15));
        tokio::pin!(stream);

        let started = Instant::now();
        let chunk = text(stream.next().await);
        assert!(chunk.starts_with(": ping "));
        assert!(chunk.ends_with("\n\n"));
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_resets_keep_alive() {
        let hub = EventHub::new();
        let (_channel, stream) = connect(&hub, "u1", Duration::from_secs(15));
        tokio::pin!(stream);

        time::advance(Duration::from_secs(10)).await;
        hub.publish("u1", "alert", &json!({}));
        assert!(text(stream.next().await).starts_with("event: alert"));

        let after_event = Instant::now();
        assert!(text(stream.next().await).starts_with(": ping"));
        assert!(after_event.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes_and_closes() {
        let hub = EventHub::new();
        let (channel, stream) = connect(&hub, "u1", Duration::from_secs(15));
        assert_eq!(hub.channel_count("u1"), 1);

        drop(stream);

        assert_eq!(hub.channel_count("u1"), 0);
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn test_server_close_ends_stream() {
        let hub = EventHub::new();
        let (channel, stream) = connect(&hub, "u1", Duration::from_secs(15));
        tokio::pin!(stream);

        hub.publish("u1", "alert", &json!({"last": true}));
        channel.close();

        assert!(text(stream.next().await).contains("\"last\":true"));
        assert!(stream.next().await.is_none());
    }
}
