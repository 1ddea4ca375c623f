//! Audio channel: fan-out multiplexer and capture session

pub mod capture;
pub mod fanout;

pub use fanout::AudioFanout;
