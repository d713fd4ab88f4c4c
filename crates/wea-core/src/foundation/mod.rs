//! Foundation layer - event model, message elements and the dispatch context.
//!
//! This module contains the fundamental building blocks of the engine:
//! - The closed [`RawEvent`] sum type delivered by the transport
//! - Message [`Element`]s and text extraction
//! - The per-event [`MessageContext`] and its [`ExecutionScope`]

pub mod context;
pub mod event;
pub mod message;
pub mod scope;

pub use context::{MessageContext, MetaValue};
pub use event::{EventKind, FriendRequest, GroupMessage, PrivateMessage, RawEvent, Sender};
pub use message::{Element, extract_text};
pub use scope::ExecutionScope;
