//! Runtime configuration.
//!
//! [`WeaConfig`] is assembled by [`ConfigLoader`] from defaults, optional
//! TOML/YAML files and `WEA_*` environment variables, then checked by
//! [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig, WeaConfig,
};
pub use validation::validate_config;
