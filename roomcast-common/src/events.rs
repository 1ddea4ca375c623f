//! State snapshot wire types
//!
//! Every message pushed over the state channel is a [`RoomEvent`]. The only
//! variant today is `update`, carrying the full {current, queue} snapshot, so
//! late joiners and long-lived subscribers decode the same shape:
//!
//! ```json
//! {
//!   "type": "update",
//!   "current": { "title": "...", "artist": "...", "elapsed": 12345 },
//!   "queue": [ { "title": "...", "filename": "..." } ]
//! }
//! ```
//!
//! `current` is `null` exactly when nothing is playing. `elapsed` is in
//! milliseconds and only present when the server itself tracks playback time
//! (local-duration mode).

use serde::{Deserialize, Serialize};

use crate::model::TrackDescriptor;

/// Currently playing track as rendered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    /// Display title (always present, placeholder if unknown)
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    /// Source file name, when the track is backed by a local file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Elapsed playback time in milliseconds (local-duration mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<u64>,
}

impl NowPlayingInfo {
    /// Render a track descriptor for the `current` slot.
    ///
    /// `filename` is populated from the descriptor's source reference only
    /// when the caller knows that reference names a local file.
    pub fn from_track(track: &TrackDescriptor, elapsed: Option<u64>, local_file: bool) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            filename: (local_file && !track.source_ref.is_empty())
                .then(|| track.source_ref.clone()),
            elapsed,
        }
    }
}

/// One pending queue entry as rendered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTrackInfo {
    /// Display title (always present, placeholder if unknown)
    pub title: String,

    /// Source file name, when the track is backed by a local file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl QueuedTrackInfo {
    /// Render a track descriptor for the queue listing.
    pub fn from_track(track: &TrackDescriptor, local_file: bool) -> Self {
        Self {
            title: track.title.clone(),
            filename: (local_file && !track.source_ref.is_empty())
                .then(|| track.source_ref.clone()),
        }
    }
}

/// Message pushed to every state-channel subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Full playback state snapshot
    Update {
        /// Currently playing track, `None` when the room is idle
        current: Option<NowPlayingInfo>,
        /// Pending tracks in play order
        queue: Vec<QueuedTrackInfo>,
    },
}

impl RoomEvent {
    /// The safe "nothing playing, empty queue" snapshot.
    ///
    /// Emitted when the queue runs out and whenever a source fetch fails, so
    /// subscribers are never left hanging on stale state.
    pub fn idle() -> Self {
        Self::Update {
            current: None,
            queue: Vec::new(),
        }
    }
}
