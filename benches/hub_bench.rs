//! Benchmarks for the alert hub
//!
//! Run with: cargo bench

use campus_sentinel::detection::AlertPayload;
use campus_sentinel::realtime::{frame, Channel, ChannelError, EventHub, SseChannel};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

/// Channel that accepts and discards every frame
struct NullChannel;

impl Channel for NullChannel {
    fn id(&self) -> &str {
        "null"
    }

    fn write(&self, frame: &str) -> Result<(), ChannelError> {
        black_box(frame);
        Ok(())
    }

    fn close(&self) {}
}

fn sample_alert() -> AlertPayload {
    AlertPayload::new("65f1c2a9e4b0123456789abc", "Fighting", 0.93, Utc::now())
        .bbox(Some([120.0, 80.0, 64.0, 128.0]))
}

fn bench_frame(c: &mut Criterion) {
    let alert = sample_alert();

    c.bench_function("frame_alert_event", |b| {
        b.iter(|| frame::event(black_box("alert"), black_box(&alert)).unwrap())
    });
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let alert = sample_alert();

    for tabs in [1, 4, 16] {
        let hub = EventHub::new();
        let _subscriptions: Vec<_> = (0..tabs)
            .map(|_| hub.subscribe("user-1", Arc::new(NullChannel)))
            .collect();

        group.throughput(Throughput::Elements(tabs as u64));
        group.bench_function(format!("fanout_{}", tabs), |b| {
            b.iter(|| hub.publish(black_box("user-1"), "alert", black_box(&alert)))
        });
    }

    group.bench_function("no_subscribers", |b| {
        let hub = EventHub::new();
        b.iter(|| hub.publish(black_box("user-1"), "alert", black_box(&alert)))
    });

    group.bench_function("sse_channel_roundtrip", |b| {
        let hub = EventHub::new();
        let (channel, mut rx) = SseChannel::new(16);
        let _subscription = hub.subscribe("user-1", Arc::new(channel));

        b.iter(|| {
            hub.publish("user-1", "alert", black_box(&alert));
            rx.try_recv().unwrap()
        })
    });

    group.finish();
}

fn bench_subscribe(c: &mut Criterion) {
    let hub = EventHub::new();
    // Background load: other users with open dashboards
    let _others: Vec<_> = (0..1000)
        .map(|i| hub.subscribe(&format!("user-{}", i), Arc::new(NullChannel)))
        .collect();

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let subscription = hub.subscribe(black_box("viewer"), Arc::new(NullChannel));
            subscription.unsubscribe();
        })
    });
}

criterion_group!(benches, bench_frame, bench_publish, bench_subscribe);
criterion_main!(benches);
