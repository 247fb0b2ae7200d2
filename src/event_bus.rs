//! Engine event fan-out for UI layers and tests.
//!
//! The engine emits a small stream of structured events — state
//! transitions, dispatches, deferrals, completions — that a rendering
//! layer subscribes to instead of polling the graph. Fan-out is
//! channel-based: each subscriber owns an independent receiver and a
//! slow subscriber never blocks the engine (channels are unbounded;
//! disconnected subscribers are pruned on send).

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::sync::Mutex;
use uuid::Uuid;

use crate::types::NodeState;

/// One observable engine occurrence, stamped at emission time.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub when: DateTime<Utc>,
    pub kind: EventKind,
}

/// What happened.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// A node's execution state changed.
    NodeStateChanged { node: String, state: NodeState },
    /// A run request was deferred because a parent has no cached result;
    /// the parent was triggered instead.
    RunDeferred { node: String, missing_parent: String },
    /// A node's operation was dispatched onto a worker task.
    RunDispatched { node: String, task: Uuid },
    /// A worker task finished and its outcome reached the cache.
    RunCompleted { node: String, task: Uuid, failed: bool },
    /// A node was renamed; its cache entry moved to the new key.
    NodeRenamed { from: String, to: String },
    /// A node (and its cache entry) was removed from the graph.
    NodeRemoved { node: String },
}

impl Event {
    pub(crate) fn now(kind: EventKind) -> Self {
        Self {
            when: Utc::now(),
            kind,
        }
    }
}

/// Subscription handle yielding engine events.
pub struct EventStream {
    receiver: flume::Receiver<Event>,
}

impl EventStream {
    /// Receive the next event, waiting if none is pending.
    ///
    /// Returns `None` once the engine is gone and the buffer drained.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv_async().await.ok()
    }

    /// Non-blocking receive.
    #[must_use]
    pub fn try_next(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Convert into a boxed async stream of events.
    #[must_use]
    pub fn into_async_stream(self) -> BoxStream<'static, Event> {
        self.receiver.into_stream().boxed()
    }
}

/// Fan-out point for engine events.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<flume::Sender<Event>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new independent subscription.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = flume::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(tx);
        EventStream { receiver: rx }
    }

    /// Deliver an event to every live subscriber.
    pub(crate) fn emit(&self, kind: EventKind) {
        let event = Event::now(kind);
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
