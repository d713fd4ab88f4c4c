//! Error types shared by every layer of the engine.
//!
//! Dispatch-level errors (handler and event bus failures) live in
//! `wea-framework`; this module only holds what the foundation itself can
//! produce.

use thiserror::Error;

use crate::foundation::EventKind;

// =============================================================================
// Client Errors
// =============================================================================

/// Errors returned by a [`Client`](crate::Client) send operation.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The connection behind the client is not usable.
    #[error("client is not connected")]
    NotConnected,

    /// The event has no conversation to reply into.
    #[error("'{kind}' events have no reply target")]
    NoReplyTarget {
        /// Kind of the event that was replied to.
        kind: EventKind,
    },

    /// The transport rejected the message.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Creates a send failure.
    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Setup-time misuse of the engine.
///
/// These are programmer errors: they surface while wiring the engine
/// together, never while dispatching an event.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// A component was used before it was installed.
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    /// A component that may only be installed once was installed again.
    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    /// A builder was finished without a required part.
    #[error("missing required component: {0}")]
    Missing(&'static str),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
