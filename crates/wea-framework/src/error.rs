//! Error types for the WEA framework.

use thiserror::Error;

use crate::event_bus::EventType;

pub use tower::BoxError;

/// Result returned by handlers and middleware chains.
pub type HandlerResult = Result<(), BoxError>;

/// A route's chain failed while handling an event.
///
/// The router hands this to its error handler and moves on to the next
/// route; it never reaches the caller of [`Router::handle`](crate::Router::handle).
#[derive(Debug, Error)]
#[error("route '{route}' failed: {source}")]
pub struct HandlerError {
    /// Name of the failing route.
    pub route: String,
    /// The error returned by the chain.
    pub source: BoxError,
}

impl HandlerError {
    /// Creates a handler error for `route`.
    pub fn new(route: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            route: route.into(),
            source: source.into(),
        }
    }
}

/// Errors returned by [`EventBus::publish`](crate::EventBus::publish).
#[derive(Debug, Error)]
pub enum EventBusError {
    /// A subscriber returned an error; later subscribers were not invoked.
    #[error("subscriber #{index} of '{tag}' failed: {source}")]
    Subscriber {
        /// Tag that was published.
        tag: EventType,
        /// Position of the failing subscriber in registration order.
        index: usize,
        /// The subscriber's error.
        source: BoxError,
    },
}

/// A handler panicked inside a [`catch_panic`](crate::middleware::catch_panic)
/// middleware.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanicked(pub String);

impl HandlerPanicked {
    /// Builds the error from a payload returned by `catch_unwind`.
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self(message)
    }
}

/// The execution scope was cancelled or expired while the chain was running.
#[derive(Debug, Clone, Error)]
#[error("execution scope ended before the handler finished")]
pub struct ScopeEnded;
