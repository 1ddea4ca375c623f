//! # Roomcast Server Library
//!
//! Playback state synchronizer and audio fan-out engine for a single shared
//! listening room: one continuously playing audio source, a mutable play
//! queue, and any number of listeners receiving synchronized state snapshots
//! and the same live audio stream.
//!
//! **Architecture:** tokio + axum. The playback scheduler serializes all
//! queue transitions behind one mutex, the state broadcaster pushes snapshots
//! over SSE, and the audio fan-out replicates one upstream byte stream to
//! every connected listener.

pub mod api;
pub mod audio;
pub mod error;
pub mod playback;
pub mod source;
pub mod sse;

pub use error::{Error, Result};
