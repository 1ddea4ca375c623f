//! Playback clock
//!
//! Pure elapsed-time computation for the current track. Used only for
//! display reconciliation; queue advancement is driven by the scheduler's
//! timer, never by reading this clock.

use std::time::Instant;

/// Elapsed milliseconds since the current track began.
pub fn elapsed_ms(started_at: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(started_at).as_millis() as u64
}
