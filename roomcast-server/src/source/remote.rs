//! Remote player source
//!
//! External-poll mode: a desktop player (YouTube Music companion API shape)
//! owns playback. This adapter pulls its current song and queue, forwards
//! enqueue requests, and proxies search. The remote API returns deeply
//! nested, loosely-typed JSON, so every mapping applies defensive defaults;
//! a missing title becomes the fixed placeholder, never a null.
//!
//! Endpoints used:
//! - `GET  {base}/api/v1/song`   current song
//! - `GET  {base}/api/v1/queue`  queue panel (items after the selected one)
//! - `POST {base}/api/v1/queue`  append `{videoId, insertPosition}`
//! - `POST {base}/api/v1/search` raw search renderer tree

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use roomcast_common::TrackDescriptor;

use crate::error::{Error, Result};
use crate::source::{SearchHit, SourceKind, SourceStrategy};

/// Adapter for a remote player HTTP API
pub struct RemotePlayerSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteSong {
    title: Option<String>,
    artist: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteQueue {
    #[serde(default)]
    items: Vec<RemoteQueueItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteQueueItem {
    #[serde(rename = "playlistPanelVideoRenderer")]
    renderer: Option<PanelRenderer>,
}

#[derive(Debug, Default, Deserialize)]
struct PanelRenderer {
    #[serde(default)]
    selected: bool,
    title: Option<TextRuns>,
}

#[derive(Debug, Default, Deserialize)]
struct TextRuns {
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Default, Deserialize)]
struct TextRun {
    #[serde(default)]
    text: String,
}

impl RemotePlayerSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unavailable(e: reqwest::Error) -> Error {
        Error::AdapterUnavailable(e.to_string())
    }

    /// Map the current-song payload. `null` means nothing playing.
    fn map_song(song: Option<RemoteSong>) -> Option<TrackDescriptor> {
        song.map(|s| TrackDescriptor::new(s.title, s.artist, None, ""))
    }

    /// Map the queue panel: only items *after* the selected one are upcoming.
    /// With no selection the whole panel counts as upcoming.
    fn map_queue(queue: RemoteQueue) -> Vec<TrackDescriptor> {
        let selected = queue
            .items
            .iter()
            .position(|item| item.renderer.as_ref().is_some_and(|r| r.selected));

        let upcoming = match selected {
            Some(index) => &queue.items[index + 1..],
            None => &queue.items[..],
        };

        upcoming
            .iter()
            .filter_map(|item| item.renderer.as_ref())
            .map(|renderer| {
                let title = renderer
                    .title
                    .as_ref()
                    .and_then(|t| t.runs.first())
                    .map(|run| run.text.clone());
                TrackDescriptor::new(title, None, None, "")
            })
            .collect()
    }

    /// Dig search hits out of the raw renderer tree.
    ///
    /// Entries without a watch endpoint (headers, shelves) are skipped.
    fn map_search(body: &Value) -> Vec<SearchHit> {
        let contents = body
            .pointer(concat!(
                "/contents/tabbedSearchResultsRenderer/tabs/0/tabRenderer",
                "/content/sectionListRenderer/contents/1/musicShelfRenderer/contents"
            ))
            .and_then(Value::as_array);

        let Some(contents) = contents else {
            return Vec::new();
        };

        contents
            .iter()
            .filter_map(|entry| {
                let run = entry.pointer(concat!(
                    "/musicResponsiveListItemRenderer/flexColumns/0",
                    "/musicResponsiveListItemFlexColumnRenderer/text/runs/0"
                ))?;
                let video_id = run
                    .pointer("/navigationEndpoint/watchEndpoint/videoId")?
                    .as_str()?;
                let title = run.get("text")?.as_str()?;
                Some(SearchHit {
                    title: title.to_string(),
                    track_ref: video_id.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SourceStrategy for RemotePlayerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn fetch_current_and_queue(
        &self,
    ) -> Result<(Option<TrackDescriptor>, Vec<TrackDescriptor>)> {
        let (song, queue) = tokio::try_join!(
            async {
                self.client
                    .get(self.url("/api/v1/song"))
                    .send()
                    .await
                    .map_err(Self::unavailable)?
                    .json::<Option<RemoteSong>>()
                    .await
                    .map_err(Self::unavailable)
            },
            async {
                self.client
                    .get(self.url("/api/v1/queue"))
                    .send()
                    .await
                    .map_err(Self::unavailable)?
                    .json::<RemoteQueue>()
                    .await
                    .map_err(Self::unavailable)
            },
        )?;

        Ok((Self::map_song(song), Self::map_queue(queue)))
    }

    async fn resolve_enqueue(&self, track_ref: &str) -> Result<Option<TrackDescriptor>> {
        debug!("Forwarding enqueue of {} to remote player", track_ref);
        self.client
            .post(self.url("/api/v1/queue"))
            .json(&json!({
                "videoId": track_ref,
                "insertPosition": "INSERT_AT_END",
            }))
            .send()
            .await
            .map_err(Self::unavailable)?
            .error_for_status()
            .map_err(Self::unavailable)?;

        // The remote queue is authoritative; nothing to append locally.
        Ok(None)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let body: Value = self
            .client
            .post(self.url("/api/v1/search"))
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(Self::unavailable)?
            .json()
            .await
            .map_err(Self::unavailable)?;

        Ok(Self::map_search(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_common::model::UNKNOWN_TITLE;

    fn panel_item(title: &str, selected: bool) -> Value {
        json!({
            "playlistPanelVideoRenderer": {
                "selected": selected,
                "title": { "runs": [ { "text": title } ] },
            }
        })
    }

    #[test]
    fn test_map_song_defaults() {
        assert!(RemotePlayerSource::map_song(None).is_none());

        let song = RemotePlayerSource::map_song(Some(RemoteSong {
            title: None,
            artist: None,
        }))
        .unwrap();
        assert_eq!(song.title, UNKNOWN_TITLE);

        let song = RemotePlayerSource::map_song(Some(RemoteSong {
            title: Some("Song".to_string()),
            artist: Some("Band".to_string()),
        }))
        .unwrap();
        assert_eq!(song.title, "Song");
        assert_eq!(song.artist.as_deref(), Some("Band"));
    }

    #[test]
    fn test_map_queue_takes_items_after_selected() {
        let queue: RemoteQueue = serde_json::from_value(json!({
            "items": [
                panel_item("played", false),
                panel_item("playing", true),
                panel_item("next", false),
                panel_item("later", false),
            ]
        }))
        .unwrap();

        let tracks = RemotePlayerSource::map_queue(queue);
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["next", "later"]);
    }

    #[test]
    fn test_map_queue_without_selection_keeps_everything() {
        let queue: RemoteQueue = serde_json::from_value(json!({
            "items": [ panel_item("a", false), panel_item("b", false) ]
        }))
        .unwrap();

        assert_eq!(RemotePlayerSource::map_queue(queue).len(), 2);
    }

    #[test]
    fn test_map_queue_skips_malformed_items_and_fills_titles() {
        let queue: RemoteQueue = serde_json::from_value(json!({
            "items": [
                { "somethingElse": {} },
                { "playlistPanelVideoRenderer": { "selected": false } },
            ]
        }))
        .unwrap();

        let tracks = RemotePlayerSource::map_queue(queue);
        // The unrecognized item is dropped; the title-less one is normalized
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_map_search_extracts_watchable_hits() {
        let body = json!({
            "contents": { "tabbedSearchResultsRenderer": { "tabs": [ { "tabRenderer": {
                "content": { "sectionListRenderer": { "contents": [
                    {},
                    { "musicShelfRenderer": { "contents": [
                        { "musicResponsiveListItemRenderer": { "flexColumns": [
                            { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                                { "text": "Hit One",
                                  "navigationEndpoint": { "watchEndpoint": { "videoId": "vid1" } } }
                            ] } } }
                        ] } },
                        { "musicResponsiveListItemRenderer": { "flexColumns": [
                            { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                                { "text": "Not Watchable" }
                            ] } } }
                        ] } }
                    ] } }
                ] } }
            } } ] } }
        });

        let hits = RemotePlayerSource::map_search(&body);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Hit One");
        assert_eq!(hits[0].track_ref, "vid1");
    }

    #[test]
    fn test_map_search_tolerates_unexpected_shape() {
        assert!(RemotePlayerSource::map_search(&json!({})).is_empty());
        assert!(RemotePlayerSource::map_search(&json!({"contents": 42})).is_empty());
    }
}
