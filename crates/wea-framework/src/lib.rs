//! # WEA Framework
//!
//! Routing and middleware on top of [`wea_core`].
//!
//! This layer provides:
//! - [`Matcher`]s that select the routes an event goes to
//! - [`Middleware`] built on tower layers, composed per dispatch
//! - [`Route`] and the [`Router`] dispatch loop
//! - A tagged [`EventBus`] for cross-cutting listeners
//! - [`LogicManager`], the registration helpers bot code uses directly
//!
//! # Dispatch at a glance
//!
//! ```text
//! RawEvent ─► MessageContext ─► Router::handle
//!                                  │ for each route, in registration order
//!                                  ├─ matchers (AND, short-circuit)
//!                                  └─ global mw ─► route mw ─► handler
//! ```

pub mod command;
pub mod error;
pub mod event_bus;
pub mod handler;
pub mod manager;
pub mod matcher;
pub mod matcher_builders;
pub mod middleware;
pub mod route;
pub mod router;

#[cfg(test)]
mod testing;

pub use command::{COMMAND_ARGS_KEY, COMMAND_KEY, CommandSpec, EXECUTED_COMMAND_KEY};
pub use error::{BoxError, EventBusError, HandlerError, HandlerPanicked, HandlerResult, ScopeEnded};
pub use event_bus::{BoxedEvent, Event, EventBus, EventType, MessageEvent, SubscriptionId};
pub use handler::{BoxedHandler, Handler, handler_fn, into_handler};
pub use manager::{LogicManager, global, install_global};
pub use matcher::{BoxedMatcher, Matcher, boxed};
pub use matcher_builders::{
    all_of, always, any_message, any_of, command, friend_request, from_user, group_message,
    in_group, never, not, private_message, text_contains, text_equals, text_prefix,
};
pub use middleware::{Middleware, Next};
pub use route::Route;
pub use router::{DispatchSummary, ErrorHandler, Router};
