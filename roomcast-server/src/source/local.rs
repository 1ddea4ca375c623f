//! Local catalog source
//!
//! Local-duration mode: tracks live in a TOML catalog with known durations
//! and file names. The scheduler is authoritative for queue state; this
//! adapter only resolves enqueue requests and answers searches.
//!
//! Catalog format:
//!
//! ```toml
//! [[tracks]]
//! title = "Some Song"
//! artist = "Some Band"
//! duration_ms = 215000
//! file = "some-song.mp3"
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use roomcast_common::TrackDescriptor;

use crate::error::{Error, Result};
use crate::source::{SearchHit, SourceKind, SourceStrategy};

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_ms: Option<u64>,
    /// File name; doubles as the track reference clients enqueue by
    pub file: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tracks: Vec<CatalogEntry>,
}

/// In-memory track catalog
pub struct LocalCatalogSource {
    entries: Vec<CatalogEntry>,
}

impl LocalCatalogSource {
    /// Load the catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: CatalogFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        info!(
            "Loaded {} catalog tracks from {}",
            catalog.tracks.len(),
            path.display()
        );
        Ok(Self {
            entries: catalog.tracks,
        })
    }

    /// Build a catalog directly from entries.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// An empty catalog: enqueues fail, searches return nothing.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn descriptor(entry: &CatalogEntry) -> TrackDescriptor {
        TrackDescriptor::new(
            entry.title.clone(),
            entry.artist.clone(),
            entry.duration_ms,
            entry.file.clone(),
        )
    }
}

#[async_trait]
impl SourceStrategy for LocalCatalogSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn fetch_current_and_queue(
        &self,
    ) -> Result<(Option<TrackDescriptor>, Vec<TrackDescriptor>)> {
        // The scheduler's own queue store is authoritative in local mode.
        Ok((None, Vec::new()))
    }

    async fn resolve_enqueue(&self, track_ref: &str) -> Result<Option<TrackDescriptor>> {
        self.entries
            .iter()
            .find(|e| e.file == track_ref)
            .map(|e| Some(Self::descriptor(e)))
            .ok_or_else(|| Error::BadRequest(format!("unknown track: {}", track_ref)))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let needle = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|e| {
                let title = e.title.as_deref().unwrap_or("").to_lowercase();
                let artist = e.artist.as_deref().unwrap_or("").to_lowercase();
                title.contains(&needle) || artist.contains(&needle)
            })
            .map(|e| SearchHit {
                title: Self::descriptor(e).title,
                track_ref: e.file.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_common::model::UNKNOWN_TITLE;
    use std::io::Write;

    fn catalog() -> LocalCatalogSource {
        LocalCatalogSource::from_entries(vec![
            CatalogEntry {
                title: Some("Morning Light".to_string()),
                artist: Some("The Examples".to_string()),
                duration_ms: Some(180_000),
                file: "morning-light.mp3".to_string(),
            },
            CatalogEntry {
                title: None,
                artist: None,
                duration_ms: None,
                file: "mystery.mp3".to_string(),
            },
        ])
    }

    #[tokio::test]
    async fn test_resolve_enqueue_known_track() {
        let track = catalog()
            .resolve_enqueue("morning-light.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(track.title, "Morning Light");
        assert_eq!(track.duration_ms, Some(180_000));
        assert_eq!(track.source_ref, "morning-light.mp3");
    }

    #[tokio::test]
    async fn test_resolve_enqueue_unknown_track_fails() {
        let err = catalog().resolve_enqueue("nope.mp3").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_untitled_entry_resolves_to_placeholder() {
        let track = catalog()
            .resolve_enqueue("mystery.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(track.title, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn test_search_matches_title_and_artist() {
        let source = catalog();

        let hits = source.search("morning").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].track_ref, "morning-light.mp3");

        let hits = source.search("EXAMPLES").await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = source.search("no such song").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_defers_to_scheduler() {
        let (current, queue) = catalog().fetch_current_and_queue().await.unwrap();
        assert!(current.is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[tracks]]\ntitle = \"Song\"\nduration_ms = 1000\nfile = \"song.mp3\""
        )
        .unwrap();

        let source = LocalCatalogSource::load(file.path()).unwrap();
        assert_eq!(source.entries.len(), 1);
        assert_eq!(source.entries[0].file, "song.mp3");
    }
}
