//! State broadcaster
//!
//! Pushes playback snapshots to every connected state-channel subscriber.
//!
//! This is an explicit registry (handle -> per-subscriber channel) rather
//! than a single broadcast primitive: delivery iterates the registry and
//! isolates failures per subscriber, so one dropped or lagging connection
//! never affects the others. A new subscriber is handed the current snapshot
//! before registration completes, so late joiners never wait for the next
//! change event.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use roomcast_common::events::RoomEvent;

/// Per-subscriber queue depth. A subscriber that falls this far behind is
/// detached rather than allowed to stall delivery.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

/// Registry of active state-channel subscribers
pub struct StateBroadcaster {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<RoomEvent>>>,
}

impl StateBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<RoomEvent>>> {
        // Registry mutation never panics while holding the lock; recover the
        // guard rather than poisoning every later subscriber.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber.
    ///
    /// `catch_up` is the current snapshot; it is queued to this subscriber
    /// alone so a late joiner immediately sees true state.
    pub fn subscribe(&self, catch_up: RoomEvent) -> (Uuid, ReceiverStream<RoomEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);

        // Capacity is fresh, the send cannot fail here.
        let _ = tx.try_send(catch_up);

        let id = Uuid::new_v4();
        let mut subs = self.registry();
        subs.insert(id, tx);
        debug!("State subscriber {} joined ({} connected)", id, subs.len());

        (id, ReceiverStream::new(rx))
    }

    /// Remove a subscriber. Idempotent.
    pub fn unsubscribe(&self, id: Uuid) {
        if self.registry().remove(&id).is_some() {
            debug!("State subscriber {} left", id);
        }
    }

    /// Deliver a snapshot to every registered subscriber, best-effort.
    ///
    /// A subscriber whose channel is closed or full is removed on the spot;
    /// delivery to the remaining subscribers is unaffected.
    pub fn broadcast(&self, event: RoomEvent) {
        self.registry().retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("State subscriber {} disconnected, removing", id);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("State subscriber {} cannot keep up, removing", id);
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// SSE response for a new state-channel connection.
    ///
    /// The subscriber is unregistered as soon as the client disconnects and
    /// the stream is dropped.
    pub fn sse_stream(
        self: Arc<Self>,
        catch_up: RoomEvent,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let (id, mut rx) = self.subscribe(catch_up);
        let broadcaster = self;

        let stream = async_stream::stream! {
            let _guard = SubscriberGuard { id, broadcaster };
            use tokio_stream::StreamExt;
            while let Some(event) = rx.next().await {
                match Event::default().json_data(&event) {
                    Ok(sse_event) => yield Ok(sse_event),
                    Err(e) => warn!("Failed to serialize snapshot for SSE: {}", e),
                }
            }
        };

        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keep-alive"),
        )
    }
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Unregisters the subscriber when its SSE stream is dropped.
struct SubscriberGuard {
    id: Uuid,
    broadcaster: Arc<StateBroadcaster>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}
