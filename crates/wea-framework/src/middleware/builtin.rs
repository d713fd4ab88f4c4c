//! Built-in middleware.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tower::timeout::TimeoutLayer;
use tracing::{Instrument, debug, debug_span, trace};

use super::{Middleware, from_fn, from_layer};
use crate::error::{BoxError, HandlerPanicked, ScopeEnded};

/// Logs every chain run at debug level with its elapsed time.
pub fn logging() -> Middleware {
    from_fn(|ctx, next| async move {
        let span = debug_span!("chain", kind = %ctx.kind(), sender = ctx.sender_uin());
        let start = Instant::now();
        let result = next.run(Arc::clone(&ctx)).instrument(span.clone()).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        span.in_scope(|| match &result {
            Ok(()) => debug!(elapsed_ms, "Chain completed"),
            Err(error) => debug!(elapsed_ms, %error, "Chain failed"),
        });
        result
    })
}

/// Turns a panic in the rest of the chain into a [`HandlerPanicked`] error.
pub fn catch_panic() -> Middleware {
    from_fn(|ctx, next| async move {
        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(Box::new(HandlerPanicked::from_payload(payload.as_ref())) as BoxError),
        }
    })
}

/// Fails the chain with `tower::timeout::error::Elapsed` if it runs longer
/// than `duration`.
pub fn timeout(duration: Duration) -> Middleware {
    from_layer(TimeoutLayer::new(duration))
}

/// Honours the context's [`ExecutionScope`](wea_core::ExecutionScope).
///
/// If the scope is already cancelled or expired the rest of the chain is
/// skipped without error. If it ends while the chain is running, the chain
/// is dropped and [`ScopeEnded`] is returned.
pub fn respect_scope() -> Middleware {
    from_fn(|ctx, next| async move {
        let scope = ctx.scope().clone();
        if scope.is_done() {
            trace!(kind = %ctx.kind(), "Scope already ended, skipping chain");
            return Ok(());
        }

        tokio::select! {
            result = next.run(ctx) => result,
            () = scope.done() => Err(Box::new(ScopeEnded) as BoxError),
        }
    })
}
