//! Observability for the document store
//!
//! Library code emits `tracing` events with structured fields; binaries
//! install a subscriber once with [`init_logging`].
//!
//! Levels used across the crate:
//! - `debug`: cache hits and collection loads
//! - `info`: backend selection, persisted writes
//! - `warn`: degraded behaviour (skipped pipeline stages, missing token)
//! - `error`: failed loads and writes

mod logger;

pub use logger::{init_logging, LogFormat, DEFAULT_FILTER};
