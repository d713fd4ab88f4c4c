//! # WEA
//!
//! The event routing and middleware engine of the WE-Assistant chat bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────┐     ┌──────────────────────────────┐
//! │  Transport  │────▶│  WeaRuntime  │────▶│ Logic  │────▶│ Route "ping"  matchers ─▶ G ─▶ L ─▶ handler
//! │  (Client)   │     │ (task/event) │     │Manager │────▶│ Route "log"   matchers ─▶ G ─▶ L ─▶ handler
//! └─────────────┘     └──────────────┘     └───┬────┘     └──────────────────────────────┘
//!                                              │
//!                                              └──▶ EventBus (message_received, command_executed)
//! ```
//!
//! - **Runtime**: pulls events from a stream and dispatches each one on its
//!   own task with a cancellable [`ExecutionScope`](wea_core::ExecutionScope)
//! - **LogicManager**: owns the [`Router`](wea_framework::Router) and the
//!   [`EventBus`](wea_framework::EventBus)
//! - **Routes**: matchers select an event; the chain is global middleware
//!   (G), then route middleware (L), then the handler
//! - **Handlers**: async functions over `Arc<MessageContext>`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wea::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> RuntimeResult<()> {
//!     let runtime = WeaRuntime::builder().client(client).build()?;
//!     runtime.use_middleware(logging());
//!     runtime.command("ping", handler_fn(|ctx| async move {
//!         ctx.reply_text("pong!").await?;
//!         Ok(())
//!     }));
//!     runtime.run(events).await
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use wea_core as core;
pub use wea_framework as framework;
pub use wea_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use wea::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use wea_runtime::{RuntimeResult, WeaConfig, WeaRuntime};

    // Event model and context
    pub use wea_core::{
        BoxedClient, Client, ClientError, ClientResult, Element, EventKind, ExecutionScope,
        MessageContext, RawEvent,
    };

    // Routing
    pub use wea_framework::{
        BoxedHandler, BoxedMatcher, EventType, HandlerResult, LogicManager, Matcher, Route,
        Router, handler_fn,
    };

    // Matchers
    pub use wea_framework::matcher_builders::{
        all_of, any_message, any_of, command, from_user, group_message, in_group, not,
        private_message, text_contains, text_equals, text_prefix,
    };

    // Middleware
    pub use wea_framework::middleware::{catch_panic, logging, respect_scope, timeout};
    pub use wea_framework::{Middleware, Next};
}
