//! # Roomcast Common Library
//!
//! Shared code for the Roomcast listening-room server:
//! - Track descriptor data model
//! - State snapshot wire types pushed to listeners
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
pub use model::TrackDescriptor;
