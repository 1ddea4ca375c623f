//! Source adapters
//!
//! A [`SourceStrategy`] supplies track data to the playback core. Two
//! implementations exist and exactly one is wired in at startup:
//!
//! - [`local::LocalCatalogSource`]: tracks come from a local catalog with
//!   known durations; the scheduler is authoritative and advances on its own
//!   timer.
//! - [`remote::RemotePlayerSource`]: a remote player owns playback; the
//!   scheduler mirrors its state on every poll and forwards enqueue requests.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use roomcast_common::TrackDescriptor;
use serde::Serialize;

use crate::error::Result;

pub use local::LocalCatalogSource;
pub use remote::RemotePlayerSource;

/// Which scheduling mode a strategy implies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Local durations known, timer-driven advancement
    Local,
    /// Remote player is the source of truth, poll/event-driven
    Remote,
}

/// One search result offered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    /// Opaque reference to pass back on enqueue
    pub track_ref: String,
}

/// External collaborator supplying track data and search results
#[async_trait]
pub trait SourceStrategy: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch the adapter's view of what is playing and what is queued.
    ///
    /// Local sources return `(None, [])`: the scheduler's own queue store is
    /// authoritative there. Remote sources return the remote player's state.
    async fn fetch_current_and_queue(
        &self,
    ) -> Result<(Option<TrackDescriptor>, Vec<TrackDescriptor>)>;

    /// Resolve an enqueue request for `track_ref`.
    ///
    /// Local sources return `Some(descriptor)` for the scheduler to append to
    /// its queue. Remote sources forward the request to the remote player and
    /// return `None`; the local queue is overwritten on the next poll.
    async fn resolve_enqueue(&self, track_ref: &str) -> Result<Option<TrackDescriptor>>;

    /// Search the source's catalog.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}
