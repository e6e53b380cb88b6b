//! Configuration loader with hierarchical merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Global config (`~/.herald/config.toml`)
//! 3. Project config (`.herald/config.toml`)
//! 4. Explicit config file (`--config`)
//! 5. Environment variables (`HERALD_*`)
//!
//! Each layer overrides the previous.

use super::{
    default_config_path, ConfigError, HeraldConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Helper macro for parsing boolean environment variables.
macro_rules! parse_env_bool {
    ($lookup:expr, $field:expr, $var:literal) => {
        if let Some(val) = $lookup($var) {
            $field = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env_var($var, "expected bool"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use herald_cli::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/project")
///     .skip_env_vars()  // For testing
///     .load()?;
/// # Ok::<(), herald_cli::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file path (defaults to ~/.herald/config.toml).
    global_config_path: Option<PathBuf>,

    /// Project root directory.
    project_root: Option<PathBuf>,

    /// Config file named on the command line. Must exist.
    explicit_path: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,

    /// Skip global config loading.
    skip_global: bool,

    /// Skip project config loading.
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config will be loaded from `<project_root>/.herald/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Adds an explicit config file, layered above the project config.
    ///
    /// Unlike the other files, a missing explicit file is an error.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any config file exists but cannot be parsed,
    /// if the explicit file cannot be read, or if an environment variable
    /// holds an invalid value. Missing global/project files are ignored.
    pub fn load(&self) -> Result<HeraldConfig, ConfigError> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    fn load_with_env(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<HeraldConfig, ConfigError> {
        let mut config = HeraldConfig::default();

        // Layer 1: Global config
        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);

            if let Some(global_config) = self.load_file(&global_path)? {
                debug!(path = %global_path.display(), "Loaded global config");
                config.merge(&global_config);
            }
        }

        // Layer 2: Project config
        if !self.skip_project {
            if let Some(ref project_root) = self.project_root {
                let project_config_path = project_root
                    .join(PROJECT_CONFIG_DIR)
                    .join(PROJECT_CONFIG_FILE);

                if let Some(project_config) = self.load_file(&project_config_path)? {
                    debug!(
                        path = %project_config_path.display(),
                        project = %project_root.display(),
                        "Loaded project config"
                    );
                    config.merge(&project_config);
                }
            }
        }

        // Layer 3: Explicit file
        if let Some(ref path) = self.explicit_path {
            let explicit = read_config(path)?;
            debug!(path = %path.display(), "Loaded explicit config");
            config.merge(&explicit);
        }

        // Layer 4: Environment variables
        if !self.skip_env {
            apply_env_vars(&mut config, lookup)?;
        }

        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(&self, path: &Path) -> Result<Option<HeraldConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        read_config(path).map(Some)
    }
}

fn read_config(path: &Path) -> Result<HeraldConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    HeraldConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Applies environment variable overrides.
fn apply_env_vars(
    config: &mut HeraldConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    // Boolean environment variables
    parse_env_bool!(lookup, config.debug, "HERALD_DEBUG");

    // Path environment variables
    if let Some(val) = lookup("HERALD_STORAGE") {
        config.logging.storage = PathBuf::from(val);
    }

    // Numeric environment variables
    if let Some(val) = lookup("HERALD_MAX_LOG_SIZE") {
        config.logging.max_size = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_env_var("HERALD_MAX_LOG_SIZE", "expected byte count"))?;
    }

    Ok(())
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off" (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, HeraldConfig::default());
    }

    #[test]
    fn load_global_config() {
        let temp = TempDir::new().unwrap();
        let config_path = create_config_file(
            temp.path(),
            r#"
debug = true

[logging]
max_size = 1234
"#,
        );

        let config = ConfigLoader::new()
            .with_global_config(&config_path)
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap();

        assert!(config.debug);
        assert_eq!(config.logging.max_size, 1234);
    }

    #[test]
    fn load_project_overrides_global() {
        let global_temp = TempDir::new().unwrap();
        let project_temp = TempDir::new().unwrap();

        let herald_dir = project_temp.path().join(".herald");
        std::fs::create_dir_all(&herald_dir).unwrap();

        let global_path = create_config_file(
            global_temp.path(),
            r#"
debug = true

[logging]
notice_file = "global.log"

[[listeners]]
event = "save"
kind = "echo"
"#,
        );

        create_config_file(
            &herald_dir,
            r#"
[logging]
notice_file = "project.log"

[[listeners]]
event = "save"
kind = "keys"
"#,
        );

        let config = ConfigLoader::new()
            .with_global_config(&global_path)
            .with_project_root(project_temp.path())
            .skip_env_vars()
            .load()
            .unwrap();

        // debug from global (not overridden in project)
        assert!(config.debug);
        assert_eq!(config.logging.notice_file, "project.log");
        // listeners accumulate
        assert_eq!(config.listeners.len(), 2);
    }

    #[test]
    fn explicit_file_overrides_project() {
        let project_temp = TempDir::new().unwrap();
        let herald_dir = project_temp.path().join(".herald");
        std::fs::create_dir_all(&herald_dir).unwrap();
        create_config_file(&herald_dir, "[logging]\nmax_size = 10\n");

        let explicit_temp = TempDir::new().unwrap();
        let explicit = create_config_file(explicit_temp.path(), "[logging]\nmax_size = 20\n");

        let config = ConfigLoader::new()
            .skip_global_config()
            .with_project_root(project_temp.path())
            .with_config_file(&explicit)
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.logging.max_size, 20);
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let err = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .with_config_file("/nonexistent/herald.toml")
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn missing_config_files_ok() {
        let config = ConfigLoader::new()
            .with_global_config("/nonexistent/path/config.toml")
            .with_project_root("/nonexistent/project")
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, HeraldConfig::default());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "debug = [not toml");
        let err = ConfigLoader::new()
            .with_global_config(&path)
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));

        assert_eq!(parse_bool("invalid"), None);
    }

    #[test]
    fn env_var_override() {
        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .load_with_env(env(&[
                ("HERALD_DEBUG", "yes"),
                ("HERALD_STORAGE", "/tmp/herald-logs"),
                ("HERALD_MAX_LOG_SIZE", " 2048 "),
            ]))
            .unwrap();

        assert!(config.debug);
        assert_eq!(config.logging.storage, PathBuf::from("/tmp/herald-logs"));
        assert_eq!(config.logging.max_size, 2048);
    }

    #[test]
    fn invalid_env_values_are_errors() {
        let loader = ConfigLoader::new().skip_global_config().skip_project_config();

        let err = loader.load_with_env(env(&[("HERALD_DEBUG", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("HERALD_DEBUG"));

        let err = loader
            .load_with_env(env(&[("HERALD_MAX_LOG_SIZE", "big")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn skip_env_ignores_lookup() {
        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .skip_env_vars()
            .load_with_env(env(&[("HERALD_DEBUG", "maybe")]))
            .unwrap();
        assert!(!config.debug);
    }
}
