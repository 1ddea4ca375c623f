//! Track descriptor data model
//!
//! A `TrackDescriptor` is an immutable value describing one queued or playing
//! item. Descriptors are created by a source adapter (on enqueue or on a
//! remote-state poll) and dropped when dequeued or superseded; they carry no
//! identity beyond their queue slot.

use uuid::Uuid;

/// Placeholder rendered whenever a source reports a track without a title.
///
/// Clients rely on `title` always being present, so missing or empty titles
/// are normalized here, never propagated as null.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Immutable description of one playable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// Queue-slot identity, assigned at construction
    pub id: Uuid,

    /// Display title (never empty; defaults to [`UNKNOWN_TITLE`])
    pub title: String,

    /// Display artist, if the source reported one
    pub artist: Option<String>,

    /// Track duration in milliseconds, if known to the source
    ///
    /// Known durations drive timer-based queue advancement. Sources that
    /// report state externally (remote player poll) typically omit this.
    pub duration_ms: Option<u64>,

    /// Opaque source reference (file name, remote video id, ...)
    ///
    /// Interpreted only by the source adapter that created the descriptor.
    pub source_ref: String,
}

impl TrackDescriptor {
    /// Build a descriptor with defensive defaults applied.
    ///
    /// Missing or blank titles become [`UNKNOWN_TITLE`]; blank artists are
    /// treated as absent.
    pub fn new(
        title: Option<String>,
        artist: Option<String>,
        duration_ms: Option<u64>,
        source_ref: impl Into<String>,
    ) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let artist = artist
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Self {
            id: Uuid::new_v4(),
            title,
            artist,
            duration_ms,
            source_ref: source_ref.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_defaults_to_placeholder() {
        let track = TrackDescriptor::new(None, None, None, "a.mp3");
        assert_eq!(track.title, UNKNOWN_TITLE);

        let track = TrackDescriptor::new(Some("   ".to_string()), None, None, "a.mp3");
        assert_eq!(track.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_title_and_artist_trimmed() {
        let track = TrackDescriptor::new(
            Some("  Song  ".to_string()),
            Some("  Band ".to_string()),
            Some(1000),
            "a.mp3",
        );
        assert_eq!(track.title, "Song");
        assert_eq!(track.artist.as_deref(), Some("Band"));
        assert_eq!(track.duration_ms, Some(1000));
    }

    #[test]
    fn test_blank_artist_treated_as_absent() {
        let track = TrackDescriptor::new(Some("Song".to_string()), Some("".to_string()), None, "x");
        assert!(track.artist.is_none());
    }

    #[test]
    fn test_each_descriptor_gets_unique_id() {
        let a = TrackDescriptor::new(Some("Song".to_string()), None, None, "a.mp3");
        let b = TrackDescriptor::new(Some("Song".to_string()), None, None, "a.mp3");
        assert_ne!(a.id, b.id);
    }
}
