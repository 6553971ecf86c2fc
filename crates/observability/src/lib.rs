//! Tracing/logging setup shared by every binary.

/// Tracing subscriber initialization.
pub mod tracing;

pub use self::tracing::{LogFormat, ParseLogFormatError, init};
