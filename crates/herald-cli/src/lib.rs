//! Library side of the `herald` binary.
//!
//! - [`config`]: layered TOML configuration
//! - [`listener`]: declarative listener definitions and validation
//! - [`builtin`]: handlers created from listeners
//! - [`app`]: controller assembly and the `run` / `events` commands

pub mod app;
pub mod builtin;
pub mod config;
pub mod listener;
