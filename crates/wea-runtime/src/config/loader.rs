//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables `wea.toml`
//! - `yaml-config`: enables `wea.yaml` / `wea.yml`
//!
//! With neither feature only defaults, environment variables and
//! programmatic overrides are used.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`wea.{profile}.toml` / `wea.{profile}.yaml`)
//! 3. Main config file (`wea.toml` / `wea.yaml`)
//! 4. Environment variables (`WEA_*`)
//! 5. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! - `WEA_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `WEA_DISPATCH__COMMAND_PREFIX=!` → `dispatch.command_prefix = "!"`
//! - `WEA_DISPATCH__DEADLINE_MS=5000` → `dispatch.deadline_ms = 5000`
//!
//! `WEA_PROFILE` selects the profile.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::WeaConfig;

const ENV_PREFIX: &str = "WEA_";
const PROFILE_ENV: &str = "WEA_PROFILE";
const FILE_STEM: &str = "wea";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `WEA_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .profile("production")
///     .search_path("./config")
///     .load()?;
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
    overrides: Vec<WeaConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader that searches the current directory and the user
    /// config directory, and reads environment variables.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
            overrides: Vec::new(),
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path. Once any is added the default paths are not used.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables environment variables (the default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration on top of every other source.
    pub fn merge(mut self, config: WeaConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Loads the configuration.
    pub fn load(self) -> ConfigResult<WeaConfig> {
        let figment = self.build_figment()?;
        let config: WeaConfig = figment.extract()?;

        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            command_prefix = %config.dispatch.command_prefix,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WeaConfig::default()));

        match &self.config_file {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                figment = merge_file(figment, path)?;
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => figment = self.merge_search_paths(figment),
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        for config in &self.overrides {
            figment = figment.merge(Serialized::defaults(config));
        }

        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(FILE_STEM));
        }
        paths
    }

    /// Merges the profile file and main file found in the first search path
    /// that has a main file.
    fn merge_search_paths(&self, mut figment: Figment) -> Figment {
        let extensions: &[&str] = &[
            #[cfg(feature = "toml-config")]
            "toml",
            #[cfg(feature = "yaml-config")]
            "yaml",
            #[cfg(feature = "yaml-config")]
            "yml",
        ];

        for dir in self.resolve_search_paths() {
            let mut found = false;
            for ext in extensions {
                let profile_path = dir.join(format!("{FILE_STEM}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_file(figment.clone(), &profile_path).unwrap_or(figment);
                }
            }
            for ext in extensions {
                let main_path = dir.join(format!("{FILE_STEM}.{ext}"));
                if main_path.exists() {
                    info!(path = %main_path.display(), "Loading configuration file");
                    figment = merge_file(figment.clone(), &main_path).unwrap_or(figment);
                    found = true;
                }
            }
            if found {
                return figment;
            }
        }

        debug!("No configuration file found, using defaults");
        figment
    }
}

/// Merges one file, dispatching on its extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<WeaConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<WeaConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogLevel, LogOutput};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wea-config-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(temp_dir("empty"))
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config, WeaConfig::default());
        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.dispatch.command_prefix, "/");
    }

    #[test]
    fn test_overrides_win() {
        let mut custom = WeaConfig::default();
        custom.logging.level = LogLevel::Debug;
        custom.dispatch.deadline_ms = Some(1500);

        let config = ConfigLoader::new()
            .search_path(temp_dir("overrides"))
            .without_env()
            .merge(custom)
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.dispatch.deadline(), Some(std::time::Duration::from_millis(1500)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/definitely/not/here/wea.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = temp_dir("ext");
        let path = dir.join("wea.ini");
        std::fs::write(&path, "level = debug").unwrap();

        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_main_file() {
        let dir = temp_dir("toml");
        std::fs::write(
            dir.join("wea.production.toml"),
            "[logging]\nlevel = \"warn\"\noutput = \"stderr\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("wea.toml"), "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = ConfigLoader::new()
            .profile("prod")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.output, LogOutput::Stderr);
    }

    #[test]
    fn test_env_mapping() {
        // SAFETY: no other test reads this variable.
        unsafe {
            std::env::set_var("WEA_DISPATCH__DEADLINE_MS", "750");
        }
        let config = ConfigLoader::new()
            .search_path(temp_dir("env"))
            .load()
            .unwrap();
        unsafe {
            std::env::remove_var("WEA_DISPATCH__DEADLINE_MS");
        }
        assert_eq!(config.dispatch.deadline_ms, Some(750));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
