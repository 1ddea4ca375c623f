//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest, handled by the binary's clap layer)
//! 2. Environment variable (also handled by clap)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Which source adapter drives the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Tracks come from a local catalog with known durations; the server
    /// advances the queue on its own timer.
    Local,
    /// A remote player owns playback; the server polls it for current/queue
    /// state and forwards enqueue requests to it.
    Remote,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMode::Local => write!(f, "local"),
            SourceMode::Remote => write!(f, "remote"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// HTTP listen port
    pub port: u16,

    /// Source adapter selection
    pub mode: SourceMode,

    /// Base URL of the remote player API (remote mode)
    pub remote_base_url: String,

    /// Remote state poll interval in milliseconds (remote mode)
    pub poll_interval_ms: u64,

    /// Path to the local track catalog TOML (local mode)
    pub catalog_path: Option<PathBuf>,

    /// Capture command producing the live audio byte stream on stdout
    ///
    /// When unset, no capture session is started and the audio channel stays
    /// idle.
    pub capture_command: Option<String>,

    /// Arguments for the capture command
    pub capture_args: Vec<String>,

    /// Directory of static UI assets served at the web root
    pub static_dir: PathBuf,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            mode: SourceMode::Local,
            remote_base_url: "http://localhost:26538".to_string(),
            poll_interval_ms: 2000,
            catalog_path: None,
            capture_command: None,
            capture_args: Vec::new(),
            static_dir: PathBuf::from("public"),
        }
    }
}

impl RoomConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Default config file location for the platform
/// (e.g. `~/.config/roomcast/config.toml` on Linux)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("roomcast").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("roomcast.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = RoomConfig::load(Path::new("/nonexistent/roomcast.toml")).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.mode, SourceMode::Local);
        assert!(config.capture_command.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8080\nmode = \"remote\"").unwrap();

        let config = RoomConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.mode, SourceMode::Remote);
        // Unspecified keys keep their defaults
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_capture_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "capture_command = \"ffmpeg\"\ncapture_args = [\"-f\", \"mp3\", \"pipe:1\"]"
        )
        .unwrap();

        let config = RoomConfig::load(file.path()).unwrap();
        assert_eq!(config.capture_command.as_deref(), Some("ffmpeg"));
        assert_eq!(config.capture_args, vec!["-f", "mp3", "pipe:1"]);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = RoomConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
