//! Playback scheduler
//!
//! State machine deciding when and how the current track changes. Two modes,
//! selected by the wired [`SourceStrategy`]:
//!
//! - **Local-duration**: tracks arrive with a known duration; on advance the
//!   scheduler pops the queue head, stamps the start time, and arms a
//!   one-shot timer that advances again when the duration expires.
//! - **External-poll**: a remote player owns playback; each refresh replaces
//!   the queue store wholesale with the adapter's view, and enqueue requests
//!   are forwarded upstream.
//!
//! All transitions serialize behind one mutex over the scheduler state, and
//! every transition ends with a snapshot broadcast, so subscribers observe
//! changes in order and never hang on stale state after a failure.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use roomcast_common::events::{NowPlayingInfo, QueuedTrackInfo, RoomEvent};

use crate::error::Result;
use crate::playback::clock;
use crate::playback::queue::QueueStore;
use crate::source::{SourceKind, SourceStrategy};
use crate::sse::StateBroadcaster;

/// Fallback duration for a local track whose length is unknown.
/// Keeps the queue moving instead of stalling on a missing probe.
const FALLBACK_DURATION_MS: u64 = 180_000;

struct SchedulerState {
    store: QueueStore,
    /// The single armed advance timer, if any
    timer: Option<JoinHandle<()>>,
    /// Bumped on every cancel/arm; a timer that fires with a stale epoch is
    /// a leftover from before a manual skip and must not advance again
    timer_epoch: u64,
}

/// Owns the queue store and the advance timer; emits snapshots on change
pub struct PlaybackScheduler {
    inner: Mutex<SchedulerState>,
    strategy: Arc<dyn SourceStrategy>,
    broadcaster: Arc<StateBroadcaster>,
    /// Handle to ourselves for the timer continuation; set at construction
    self_ref: Weak<PlaybackScheduler>,
}

impl PlaybackScheduler {
    pub fn new(strategy: Arc<dyn SourceStrategy>, broadcaster: Arc<StateBroadcaster>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            inner: Mutex::new(SchedulerState {
                store: QueueStore::new(),
                timer: None,
                timer_epoch: 0,
            }),
            strategy,
            broadcaster,
            self_ref: self_ref.clone(),
        })
    }

    /// Handle an enqueue request for `track_ref`.
    ///
    /// Local mode: resolve to a descriptor, append it, and start playing
    /// immediately if the room was idle. Remote mode: forward the request to
    /// the remote player, then refresh so subscribers see its updated queue.
    pub async fn enqueue(&self, track_ref: &str) -> Result<()> {
        match self.strategy.resolve_enqueue(track_ref).await? {
            Some(track) => {
                // Append and, if the room was idle, advance under the same
                // guard: releasing the lock in between would let a second
                // enqueue observe the idle room too and advance twice.
                let mut st = self.inner.lock().await;
                debug!("Enqueued '{}' ({} pending)", track.title, st.store.pending_len() + 1);
                st.store.push_pending(track);
                let event = if st.store.is_idle() {
                    self.advance_locked(&mut st)
                } else {
                    self.event_from(&st.store)
                };
                self.broadcaster.broadcast(event);
                Ok(())
            }
            None => {
                // Forwarded to the remote player; mirror its new state now
                // rather than waiting for the next poll tick.
                self.refresh().await;
                Ok(())
            }
        }
    }

    /// Advance to the next track (timer expiry or manual skip).
    ///
    /// Cancels any pending timer, pops the queue head into the current slot,
    /// and arms a fresh timer for the new track's duration. With an empty
    /// queue the room transitions to the terminal idle state. Exactly one
    /// timer is armed at any time.
    pub async fn advance(&self) {
        let mut st = self.inner.lock().await;
        let event = self.advance_locked(&mut st);
        // Broadcast before releasing the lock so concurrent transitions
        // cannot interleave their snapshots out of order. Delivery is
        // try_send per subscriber and never blocks.
        self.broadcaster.broadcast(event);
    }

    /// Timer continuation: advance only if no cancel/re-arm happened since
    /// this timer was armed.
    async fn advance_if_epoch(&self, epoch: u64) {
        let mut st = self.inner.lock().await;
        if st.timer_epoch != epoch {
            debug!("Stale advance timer (epoch {}), ignoring", epoch);
            return;
        }
        let event = self.advance_locked(&mut st);
        self.broadcaster.broadcast(event);
    }

    fn advance_locked(&self, st: &mut SchedulerState) -> RoomEvent {
        // Cancel-then-arm is one atomic step under the state lock.
        st.timer_epoch += 1;
        if let Some(timer) = st.timer.take() {
            timer.abort();
        }

        match st.store.pop_pending() {
            Some(track) => {
                let duration_ms = track.duration_ms.unwrap_or(FALLBACK_DURATION_MS);
                debug!("Now playing '{}' for {}ms", track.title, duration_ms);
                st.store.set_current(track, Instant::now());

                let epoch = st.timer_epoch;
                let weak = self.self_ref.clone();
                st.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                    if let Some(scheduler) = weak.upgrade() {
                        scheduler.advance_if_epoch(epoch).await;
                    }
                }));

                self.event_from(&st.store)
            }
            None => {
                debug!("Queue exhausted, room is idle");
                st.store.clear_current();
                RoomEvent::idle()
            }
        }
    }

    /// Mirror the external source's state (external-poll mode).
    ///
    /// On fetch failure an explicit idle snapshot is broadcast instead of an
    /// error payload, and the local store is cleared so late joiners see the
    /// same thing.
    pub async fn refresh(&self) {
        let fetched = self.strategy.fetch_current_and_queue().await;
        let mut st = self.inner.lock().await;
        let event = match fetched {
            Ok((current, pending)) => {
                st.store.replace(current, pending, Instant::now());
                self.event_from(&st.store)
            }
            Err(e) => {
                warn!("Source fetch failed: {}", e);
                st.store.replace(None, Vec::new(), Instant::now());
                RoomEvent::idle()
            }
        };
        self.broadcaster.broadcast(event);
    }

    /// Manual skip.
    ///
    /// Local mode advances immediately. Remote mode is a no-op: the remote
    /// player owns advancement and will report any change on the next poll.
    pub async fn skip(&self) {
        match self.strategy.kind() {
            SourceKind::Local => self.advance().await,
            SourceKind::Remote => debug!("Skip ignored in remote mode"),
        }
    }

    /// Current snapshot, for catch-up delivery and REST reads.
    pub async fn snapshot(&self) -> RoomEvent {
        let st = self.inner.lock().await;
        self.event_from(&st.store)
    }

    /// Poll the external source at a fixed interval. Runs until the process
    /// exits; spawned only in remote mode.
    pub async fn run_poll_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }

    fn event_from(&self, store: &QueueStore) -> RoomEvent {
        let local = self.strategy.kind() == SourceKind::Local;
        let view = store.view();

        let current = view.current.as_ref().map(|track| {
            let elapsed = match (local, view.started_at) {
                (true, Some(started_at)) => Some(clock::elapsed_ms(started_at, Instant::now())),
                _ => None,
            };
            NowPlayingInfo::from_track(track, elapsed, local)
        });

        let queue = view
            .pending
            .iter()
            .map(|track| QueuedTrackInfo::from_track(track, local))
            .collect();

        RoomEvent::Update { current, queue }
    }
}
