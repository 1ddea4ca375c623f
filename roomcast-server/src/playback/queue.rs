//! Queue store
//!
//! Ordered sequence of pending tracks plus the "current" slot. The store is
//! owned exclusively by the playback scheduler (behind its mutex); everything
//! else sees read-only views.
//!
//! Invariant: `current` is `Some` exactly when `started_at` is `Some`. The
//! mutators below are the only way to touch either field, so the invariant
//! holds by construction.

use std::collections::VecDeque;
use std::time::Instant;

use roomcast_common::TrackDescriptor;

/// Read-only copy of the store handed to the broadcaster
#[derive(Debug, Clone)]
pub struct QueueView {
    pub current: Option<TrackDescriptor>,
    pub started_at: Option<Instant>,
    pub pending: Vec<TrackDescriptor>,
}

/// Mutable queue state: current slot + pending tracks
#[derive(Debug, Default)]
pub struct QueueStore {
    current: Option<TrackDescriptor>,
    started_at: Option<Instant>,
    pending: VecDeque<TrackDescriptor>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track to the end of the pending queue.
    ///
    /// No upper bound is enforced here; a collaborator may cap the queue.
    pub fn push_pending(&mut self, track: TrackDescriptor) {
        self.pending.push_back(track);
    }

    /// Pop the head of the pending queue.
    pub fn pop_pending(&mut self) -> Option<TrackDescriptor> {
        self.pending.pop_front()
    }

    /// Set the current slot and its start timestamp.
    pub fn set_current(&mut self, track: TrackDescriptor, now: Instant) {
        self.current = Some(track);
        self.started_at = Some(now);
    }

    /// Clear the current slot (terminal idle state).
    pub fn clear_current(&mut self) {
        self.current = None;
        self.started_at = None;
    }

    /// Replace current and pending wholesale with an external source's view.
    ///
    /// Used in external-poll mode where the adapter is authoritative. The
    /// start timestamp is reset to `now` for whatever is current; elapsed
    /// time is not reported in that mode, so this only keeps the invariant.
    pub fn replace(
        &mut self,
        current: Option<TrackDescriptor>,
        pending: Vec<TrackDescriptor>,
        now: Instant,
    ) {
        self.started_at = current.as_ref().map(|_| now);
        self.current = current;
        self.pending = pending.into();
    }

    pub fn current(&self) -> Option<&TrackDescriptor> {
        self.current.as_ref()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Clone out a read-only view for snapshot rendering.
    pub fn view(&self) -> QueueView {
        QueueView {
            current: self.current.clone(),
            started_at: self.started_at,
            pending: self.pending.iter().cloned().collect(),
        }
    }
}
