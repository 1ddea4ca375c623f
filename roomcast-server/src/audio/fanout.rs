//! Audio fan-out multiplexer
//!
//! Replicates one continuous upstream byte stream to every attached listener
//! sink. Like the state broadcaster this is an explicit registry with
//! per-sink isolation: a slow or closed sink is detached without blocking the
//! upstream or the other sinks. No chunk is buffered beyond each sink's
//! bounded channel; a joiner starts mid-stream and a reconnecting listener
//! regains nothing. This is a live broadcast, not a file server.
//!
//! Upstream lifecycle: `Idle` -> (`begin_upstream`) -> `Streaming` ->
//! (`end_upstream`) -> `Idle`, detaching all sinks. At most one upstream
//! producer may be live at a time; a second `begin_upstream` is rejected as
//! caller misuse.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Per-sink queue depth in chunks. At 8 KiB chunks this is roughly two
/// seconds of 128 kbit/s audio; a sink further behind is cut loose.
const SINK_CHANNEL_CAPACITY: usize = 32;

/// Upstream producer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamState {
    /// No upstream producer attached
    Idle,
    /// Upstream attached, chunks flowing to >= 0 sinks
    Streaming,
}

/// Registry of active audio sinks plus the upstream state flag
pub struct AudioFanout {
    sinks: Mutex<HashMap<Uuid, mpsc::Sender<Bytes>>>,
    upstream: Mutex<UpstreamState>,
}

impl AudioFanout {
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
            upstream: Mutex::new(UpstreamState::Idle),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Bytes>>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> MutexGuard<'_, UpstreamState> {
        self.upstream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a new sink; it receives chunks from the next emission onward.
    pub fn attach(&self) -> (Uuid, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(SINK_CHANNEL_CAPACITY);
        let id = Uuid::new_v4();
        let mut sinks = self.registry();
        sinks.insert(id, tx);
        debug!("Audio sink {} attached ({} listening)", id, sinks.len());
        (id, rx)
    }

    /// Detach a sink. Idempotent; detaching an unknown sink is a no-op.
    pub fn detach(&self, id: Uuid) {
        if self.registry().remove(&id).is_some() {
            debug!("Audio sink {} detached", id);
        }
    }

    /// Deliver one upstream chunk to every attached sink.
    ///
    /// Non-blocking per sink: a closed sink is removed quietly, a full one is
    /// removed with a warning. Either way the remaining sinks and the
    /// upstream are unaffected.
    pub fn publish(&self, chunk: Bytes) {
        self.registry().retain(|id, tx| match tx.try_send(chunk.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Audio sink {} disconnected, removing", id);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Audio sink {} cannot keep up, removing", id);
                false
            }
        });
    }

    /// Mark the upstream producer live.
    ///
    /// Rejects a duplicate start: exactly one capture/transcode session may
    /// run at a time.
    pub fn begin_upstream(&self) -> Result<()> {
        let mut state = self.state();
        if *state == UpstreamState::Streaming {
            warn!("Rejecting duplicate upstream start");
            return Err(Error::UpstreamActive);
        }
        *state = UpstreamState::Streaming;
        debug!("Upstream audio producer attached");
        Ok(())
    }

    /// Mark the upstream ended and detach all sinks.
    ///
    /// Dropping the senders ends each listener's stream; no error payload is
    /// sent over the audio channel itself.
    pub fn end_upstream(&self) {
        *self.state() = UpstreamState::Idle;
        let mut sinks = self.registry();
        if !sinks.is_empty() {
            debug!("Upstream ended, detaching {} sinks", sinks.len());
        }
        sinks.clear();
    }

    pub fn upstream_state(&self) -> UpstreamState {
        *self.state()
    }

    pub fn sink_count(&self) -> usize {
        self.registry().len()
    }
}

impl Default for AudioFanout {
    fn default() -> Self {
        Self::new()
    }
}

/// Detaches the sink when a listener's response body is dropped.
pub struct SinkGuard {
    pub id: Uuid,
    pub fanout: std::sync::Arc<AudioFanout>,
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.fanout.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunk_reaches_all_sinks() {
        let fanout = AudioFanout::new();
        let (_a, mut rx_a) = fanout.attach();
        let (_b, mut rx_b) = fanout.attach();

        fanout.publish(Bytes::from_static(b"chunk"));

        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"chunk"));
        assert_eq!(rx_b.recv().await.unwrap(), Bytes::from_static(b"chunk"));
    }

    #[tokio::test]
    async fn test_detach_mid_stream_leaves_other_sequence_intact() {
        let fanout = AudioFanout::new();
        let (id_a, mut rx_a) = fanout.attach();
        let (_b, mut rx_b) = fanout.attach();

        fanout.publish(Bytes::from_static(b"one"));
        fanout.detach(id_a);
        fanout.publish(Bytes::from_static(b"two"));

        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert!(rx_a.recv().await.is_none());

        assert_eq!(rx_b.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(rx_b.recv().await.unwrap(), Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_detach_unknown_sink_is_noop() {
        let fanout = AudioFanout::new();
        let (_a, _rx) = fanout.attach();

        fanout.detach(Uuid::new_v4());
        assert_eq!(fanout.sink_count(), 1);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_no_replay() {
        let fanout = AudioFanout::new();
        fanout.publish(Bytes::from_static(b"before"));

        let (_a, mut rx) = fanout.attach();
        fanout.publish(Bytes::from_static(b"after"));

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"after"));
    }

    #[tokio::test]
    async fn test_slow_sink_detached_without_blocking() {
        let fanout = AudioFanout::new();
        let (_slow, _rx_slow) = fanout.attach();
        let (_ok, mut rx_ok) = fanout.attach();

        // Overflow the slow sink's channel; it is never drained.
        for _ in 0..(SINK_CHANNEL_CAPACITY + 8) {
            fanout.publish(Bytes::from_static(b"x"));
            rx_ok.recv().await.unwrap();
        }

        assert_eq!(fanout.sink_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_sink_detached_on_next_publish() {
        let fanout = AudioFanout::new();
        let (_a, rx) = fanout.attach();
        drop(rx);

        fanout.publish(Bytes::from_static(b"x"));
        assert_eq!(fanout.sink_count(), 0);
    }

    #[test]
    fn test_duplicate_upstream_start_rejected() {
        let fanout = AudioFanout::new();
        fanout.begin_upstream().unwrap();

        assert!(matches!(
            fanout.begin_upstream(),
            Err(Error::UpstreamActive)
        ));
        assert_eq!(fanout.upstream_state(), UpstreamState::Streaming);
    }

    #[tokio::test]
    async fn test_upstream_end_detaches_all_sinks() {
        let fanout = AudioFanout::new();
        fanout.begin_upstream().unwrap();
        let (_a, mut rx_a) = fanout.attach();
        let (_b, mut rx_b) = fanout.attach();

        fanout.end_upstream();

        assert_eq!(fanout.upstream_state(), UpstreamState::Idle);
        assert_eq!(fanout.sink_count(), 0);
        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());

        // Idle -> Streaming is allowed again after a clean end
        fanout.begin_upstream().unwrap();
    }
}
