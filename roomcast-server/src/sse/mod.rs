//! State channel: subscriber registry + SSE transport

pub mod broadcaster;

pub use broadcaster::StateBroadcaster;
