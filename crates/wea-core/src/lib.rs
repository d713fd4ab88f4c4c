//! # WEA Core
//!
//! Foundation types for the WE-Assistant dispatch engine.
//!
//! This crate carries everything a handler needs to look at an inbound chat
//! event and answer it, without knowing anything about routing:
//!
//! ## Foundation Layer
//!
//! - **Event model**: the closed [`RawEvent`] sum type over private messages,
//!   group messages and friend requests, plus message [`Element`]s
//! - **Context**: the per-event [`MessageContext`] envelope with its shared
//!   metadata bag
//! - **Execution scope**: [`ExecutionScope`], a cancellation token with an
//!   optional deadline attached to every context
//!
//! ## Integration Layer
//!
//! - **Client**: the narrow [`Client`] send capability implemented by the
//!   transport that delivered the event
//!
//! ## Formatting
//!
//! - [`format`]: JSON and one-line summaries of messages for logging
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wea_core::{Element, MessageContext, RawEvent};
//!
//! async fn on_event(client: wea_core::BoxedClient, event: RawEvent) {
//!     let ctx = Arc::new(MessageContext::new(client, event));
//!     if ctx.message_text() == "/ping" {
//!         ctx.reply(vec![Element::text("pong!")]).await.ok();
//!     }
//! }
//! ```

pub mod error;
pub mod format;
pub mod foundation;
pub mod integration;

pub use error::{ClientError, ClientResult, ConfigurationError};
pub use foundation::{
    Element, EventKind, ExecutionScope, FriendRequest, GroupMessage, MessageContext, MetaValue,
    PrivateMessage, RawEvent, Sender, extract_text,
};
pub use integration::{BoxedClient, Client};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::{BoxedClient, Client};
    pub use super::{ClientError, ClientResult};
}
