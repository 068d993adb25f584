//! Alert Event Hub
//!
//! Process-wide registry of open alert channels, keyed by user identity.
//! Producers call [`EventHub::publish`] after recording a detection; the hub
//! frames the event and writes it to every channel the user has open.
//!
//! All registry operations are short synchronous critical sections behind a
//! single mutex. `publish` holds the lock while it writes, so a channel whose
//! [`Subscription`] has been released is never written again.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;

use super::frame;

/// Identity under which channels are grouped (the authenticated user ID)
pub type SubscriberKey = String;

/// One open delivery path to a connected client.
///
/// Implementations must not block in `write` and must not call back into the
/// hub from `write` or `close`; both run while the registry lock is held.
pub trait Channel: Send + Sync {
    /// Opaque identifier used for tracing only
    fn id(&self) -> &str;

    /// Push one framed message to the transport
    fn write(&self, frame: &str) -> Result<(), ChannelError>;

    /// Terminate the channel from the server side. Calling it again is a no-op.
    fn close(&self);
}

/// Errors a channel reports from `write`
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,

    #[error("Channel buffer full")]
    Full,
}

/// Registered channel. `slot` is unique for the lifetime of the hub and is
/// what a [`Subscription`] removes, so a recycled allocation can never be
/// mistaken for the channel it replaced.
struct Entry {
    slot: u64,
    channel: Arc<dyn Channel>,
}

#[derive(Default)]
struct Registry {
    channels: Mutex<HashMap<SubscriberKey, Vec<Entry>>>,
    next_slot: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberKey, Vec<Entry>>> {
        // Every mutation is a single push/retain, so a panic elsewhere cannot
        // leave the map half-updated.
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, key: &str, slot: u64) -> bool {
        let mut channels = self.lock();
        let Some(entries) = channels.get_mut(key) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|entry| entry.slot != slot);
        let removed = entries.len() != before;

        if entries.is_empty() {
            channels.remove(key);
        }
        removed
    }
}

/// Shared alert hub. Cloning is cheap; all clones share one registry.
#[derive(Clone, Default)]
pub struct EventHub {
    registry: Arc<Registry>,
}

impl EventHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `channel` under `key`.
    ///
    /// Registering the same channel object twice under one key keeps a single
    /// entry; the returned subscription then refers to that entry.
    pub fn subscribe(&self, key: &str, channel: Arc<dyn Channel>) -> Subscription {
        let mut channels = self.registry.lock();
        let entries = channels.entry(key.to_string()).or_default();

        let slot = match entries
            .iter()
            .find(|entry| Arc::ptr_eq(&entry.channel, &channel))
        {
            Some(existing) => existing.slot,
            None => {
                let slot = self.registry.next_slot.fetch_add(1, Ordering::Relaxed);
                entries.push(Entry {
                    slot,
                    channel: Arc::clone(&channel),
                });
                slot
            }
        };
        let count = entries.len();
        drop(channels);

        tracing::info!(
            user_id = %key,
            channel_id = %channel.id(),
            channels = count,
            "Alert channel subscribed"
        );

        Subscription {
            registry: Arc::downgrade(&self.registry),
            key: key.to_string(),
            slot,
            channel_id: channel.id().to_string(),
            released: AtomicBool::new(false),
        }
    }

    /// Write a named event to every channel registered under `key`.
    ///
    /// Channels whose write fails are closed and dropped from the registry;
    /// delivery continues with the rest. Nothing is reported to the caller.
    pub fn publish<T: Serialize + ?Sized>(&self, key: &str, event: &str, payload: &T) {
        let mut channels = self.registry.lock();
        let Some(entries) = channels.get_mut(key) else {
            return;
        };
        if entries.is_empty() {
            return;
        }

        let message = match frame::event(event, payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(user_id = %key, event = %event, error = %e, "Dropping unframeable event");
                return;
            }
        };

        let mut delivered = 0usize;
        entries.retain(|entry| match entry.channel.write(&message) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                tracing::debug!(
                    user_id = %key,
                    channel_id = %entry.channel.id(),
                    error = %e,
                    "Alert channel write failed, removing"
                );
                entry.channel.close();
                false
            }
        });

        if entries.is_empty() {
            channels.remove(key);
        }

        tracing::trace!(user_id = %key, event = %event, delivered, "Published event");
    }

    /// Number of users with at least one open channel
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Number of open channels registered under `key`
    pub fn channel_count(&self, key: &str) -> usize {
        self.registry.lock().get(key).map(Vec::len).unwrap_or(0)
    }

    /// Number of open channels across all users
    pub fn total_channels(&self) -> usize {
        self.registry.lock().values().map(Vec::len).sum()
    }
}

/// Handle returned by [`EventHub::subscribe`].
///
/// [`Subscription::unsubscribe`] removes exactly the registered channel and
/// is idempotent. Dropping the handle does not unsubscribe; transports tie it
/// to connection teardown themselves (see `ConnectionGuard`).
pub struct Subscription {
    registry: Weak<Registry>,
    key: SubscriberKey,
    slot: u64,
    channel_id: String,
    released: AtomicBool,
}

impl Subscription {
    /// Remove the channel from the hub. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let removed = self
            .registry
            .upgrade()
            .map(|registry| registry.remove(&self.key, self.slot))
            .unwrap_or(false);

        tracing::info!(
            user_id = %self.key,
            channel_id = %self.channel_id,
            removed,
            "Alert channel unsubscribed"
        );
    }

    /// Subscriber key this handle belongs to
    pub fn key(&self) -> &str {
        &self.key
    }
}
