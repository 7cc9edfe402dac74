//! # Icewatch Common Library
//!
//! Shared code for the icewatch client and tools:
//! - Error and result types
//! - TOML configuration loading and source resolution
//! - Event types (ClientEvent) and the EventBus
//! - Clock abstraction and timestamp helpers
//! - Device identifier utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use time::{Clock, FixedClock, SystemClock};
