//! Registry of open push channels.
//!
//! # Responsibilities
//! - Track every browser connected over the push channel
//! - Fan a message out to all of them
//! - Drop connections whose task has gone away
//!
//! # Design Decisions
//! - Membership is by [`ConnectionId`] only
//! - The lock is never held across a socket write: a send only enqueues onto
//!   the connection's bounded outbound queue; the connection's own task
//!   performs the write
//! - A failed send removes that connection and is logged, never returned

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

/// Outbound messages a push channel can have queued before sends are
/// skipped. Reload is idempotent, so a full queue already implies a reload.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 8;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push-{}", self.0)
    }
}

/// Sending half of one push channel.
///
/// The receiving half belongs to the task that owns the WebSocket.
#[derive(Debug, Clone)]
pub struct PushChannel {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl PushChannel {
    /// Create a channel handle and the queue its socket task reads from.
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (
            Self {
                id: ConnectionId::next(),
                outbound,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn try_send(&self, message: &str) -> Result<(), TrySendError<String>> {
        self.outbound.try_send(message.to_owned())
    }
}

/// Set of open push channels, guarded by a single lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    channels: Mutex<HashMap<ConnectionId, PushChannel>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel. Returns false if it was already registered.
    pub fn register(&self, channel: PushChannel) -> bool {
        let mut channels = self.lock();
        if channels.contains_key(&channel.id) {
            return false;
        }
        channels.insert(channel.id, channel);
        true
    }

    /// Remove a channel. Returns false if it was not registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Queue `message` on every registered channel.
    ///
    /// Channels whose socket task has exited are removed. Returns the number
    /// of channels the message was queued on.
    pub fn broadcast(&self, message: &str) -> usize {
        let mut delivered = 0;
        self.lock().retain(|id, channel| match channel.try_send(message) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(connection_id = %id, "Outbound queue full, message skipped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(
                    connection_id = %id,
                    "Error broadcasting to push channel, removing it"
                );
                false
            }
        });
        delivered
    }

    /// Drop every channel. Each socket task sees its queue close, sends a
    /// close frame and exits. Returns how many were registered.
    pub fn close_all(&self) -> usize {
        let drained: Vec<PushChannel> = self.lock().drain().map(|(_, channel)| channel).collect();
        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, PushChannel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
