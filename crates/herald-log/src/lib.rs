//! Durable diagnostics for Herald.
//!
//! [`FileSink`] implements [`herald_core::MessageSink`] by appending
//! finalized errors, visitor errors and notices to separate files under a
//! storage directory, rotating any file that grows past
//! [`LogConfig::max_size`]. Messages pass through [`sanitize`] first.
//!
//! Write failures never reach the code that produced the message; they
//! are reported through `tracing` and the entry is dropped.

mod config;
mod error;
mod file;
mod sanitize;

pub use config::{LogConfig, DEFAULT_MAX_SIZE};
pub use error::LogError;
pub use file::FileSink;
pub use sanitize::sanitize;
