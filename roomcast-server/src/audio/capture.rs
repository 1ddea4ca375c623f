//! Capture session
//!
//! Spawns the configured capture command (typically ffmpeg reading a system
//! audio device and encoding MP3 to stdout) and feeds its stdout into the
//! fan-out multiplexer chunk by chunk. When the process exits or its pipe
//! errors, all sinks are detached and the condition is surfaced to the
//! caller, who decides whether to restart.

use std::process::Stdio;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::audio::AudioFanout;
use crate::error::{Error, Result};

/// Read size for the capture pipe
const CHUNK_SIZE: usize = 8192;

/// Run one capture session to completion.
///
/// Holds the fan-out's upstream slot for the whole session; a second call
/// while one is running fails with [`Error::UpstreamActive`] before spawning
/// anything. Returns `Ok(())` on clean EOF and an error if the process could
/// not be spawned or its pipe failed.
pub async fn run_capture(
    fanout: Arc<AudioFanout>,
    command: &str,
    args: &[String],
) -> Result<()> {
    fanout.begin_upstream()?;
    let result = pump(&fanout, command, args).await;
    fanout.end_upstream();

    match &result {
        Ok(()) => info!("Capture session ended (upstream EOF)"),
        Err(e) => error!("Capture session failed: {}", e),
    }
    result
}

async fn pump(fanout: &AudioFanout, command: &str, args: &[String]) -> Result<()> {
    info!("Starting capture: {} {}", command, args.join(" "));

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("capture stdout not piped".to_string()))?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let result = loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(n) => fanout.publish(Bytes::copy_from_slice(&buf[..n])),
            Err(e) => break Err(Error::Io(e)),
        }
    };

    match &result {
        // Clean EOF: reap the exited process
        Ok(()) => {
            if let Err(e) = child.wait().await {
                warn!("Failed to reap capture process: {}", e);
            }
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill capture process: {}", e);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fanout::UpstreamState;

    #[tokio::test]
    async fn test_capture_feeds_sinks_and_releases_upstream() {
        let fanout = Arc::new(AudioFanout::new());
        let (_id, mut rx) = fanout.attach();

        run_capture(Arc::clone(&fanout), "echo", &["-n".to_string(), "audio".to_string()])
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"audio");

        // Session ended: upstream idle, all sinks detached
        assert_eq!(fanout.upstream_state(), UpstreamState::Idle);
        assert_eq!(fanout.sink_count(), 0);
    }

    #[tokio::test]
    async fn test_second_session_rejected_while_active() {
        let fanout = Arc::new(AudioFanout::new());
        fanout.begin_upstream().unwrap();

        let err = run_capture(Arc::clone(&fanout), "echo", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamActive));

        // The running session's upstream slot is untouched
        assert_eq!(fanout.upstream_state(), UpstreamState::Streaming);
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_upstream_to_idle() {
        let fanout = Arc::new(AudioFanout::new());

        let err = run_capture(Arc::clone(&fanout), "/nonexistent/capture-bin", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(fanout.upstream_state(), UpstreamState::Idle);
    }
}
