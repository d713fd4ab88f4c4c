//! # WEA Runtime
//!
//! Everything needed to run a [`LogicManager`](wea_framework::LogicManager)
//! as a process:
//!
//! - **Configuration**: layered loading with figment (defaults, config
//!   file, `WEA_*` environment variables) and validation
//! - **Logging**: a tracing subscriber built from [`LoggingConfig`]
//! - **Event loop**: [`WeaRuntime`], which dispatches a stream of events
//!   concurrently and shuts down on Ctrl+C
//!
//! ## Example
//!
//! ```rust,ignore
//! use wea_runtime::WeaRuntime;
//!
//! #[tokio::main]
//! async fn main() -> wea_runtime::RuntimeResult<()> {
//!     let runtime = WeaRuntime::builder().client(client).build()?;
//!     runtime.run(events).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigLoader, DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, Profile,
    SpanEventConfig, WeaConfig, load_config, load_config_from_file, validate_config,
};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use runtime::{RuntimeBuilder, RuntimeStats, WeaRuntime};
