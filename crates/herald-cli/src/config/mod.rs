//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! Configuration is loaded from multiple sources with priority-based merging:
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────┐
//! │  1. Environment Variables (HERALD_*)     │  Runtime override
//! ├──────────────────────────────────────────┤
//! │  2. Explicit file (--config)             │  Invocation-specific
//! ├──────────────────────────────────────────┤
//! │  3. Project Config (.herald/config.toml) │  Project-specific
//! ├──────────────────────────────────────────┤
//! │  4. Global Config (~/.herald/config.toml)│  User defaults
//! ├──────────────────────────────────────────┤
//! │  5. Default Values (compile-time)        │  Fallback
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `HERALD_DEBUG` | `debug` | bool |
//! | `HERALD_STORAGE` | `logging.storage` | PathBuf |
//! | `HERALD_MAX_LOG_SIZE` | `logging.max_size` | u64 |
//!
//! # Example Configuration
//!
//! ```toml
//! # .herald/config.toml
//! debug = false
//!
//! [logging]
//! storage = "data"
//! error_file = "errors.log"
//! visitor_file = "visitor_errors.log"
//! notice_file = "notices.log"
//! max_size = 5000000
//!
//! [[listeners]]
//! event = "save"
//! kind = "template"
//! template = "saved {file}"
//! priority = 10
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::HeraldConfig;

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".herald")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".herald";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
