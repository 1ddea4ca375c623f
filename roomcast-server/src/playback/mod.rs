//! Playback core: clock, queue store, and scheduler

pub mod clock;
pub mod queue;
pub mod scheduler;

pub use queue::QueueStore;
pub use scheduler::PlaybackScheduler;
