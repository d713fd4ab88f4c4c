//! The route table and dispatch loop.
//!
//! # Dispatch
//!
//! [`Router::handle`] takes a snapshot of the registered routes, the global
//! middleware and the error handler under a shared lock, releases the lock
//! and then walks the snapshot in registration order. Registration that
//! happens during a dispatch is therefore only visible to later dispatches.
//!
//! For each route the matchers are evaluated; on success the chain
//! `global middleware → route middleware → handler` is built and invoked.
//! A failing or panicking chain is reported to the error handler and
//! dispatch continues with the next route. Routes for one event run
//! sequentially.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use parking_lot::RwLock;
use tower::ServiceExt;
use tracing::{Instrument, debug, debug_span, error, trace};
use wea_core::MessageContext;

use crate::error::{BoxError, HandlerError, HandlerPanicked};
use crate::middleware::Middleware;
use crate::route::Route;

/// Callback invoked with every route failure.
pub type ErrorHandler = Arc<dyn Fn(&HandlerError, &MessageContext) + Send + Sync>;

/// Outcome of one [`Router::handle`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Routes in the snapshot.
    pub evaluated: usize,
    /// Routes whose matchers accepted the event.
    pub matched: usize,
    /// Matched routes whose chain returned an error.
    pub failed: usize,
}

#[derive(Default)]
struct RouterState {
    routes: Vec<Arc<Route>>,
    middleware: Vec<Middleware>,
}

/// Routes events to handlers.
///
/// `Router` is `Send + Sync`; share it behind an `Arc` and call
/// [`handle`](Self::handle) from as many tasks as needed.
pub struct Router {
    state: RwLock<RouterState>,
    error_handler: RwLock<ErrorHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router whose error handler logs failures.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RouterState::default()),
            error_handler: RwLock::new(Arc::new(log_error)),
        }
    }

    /// Appends a route.
    pub fn add_route(&self, route: Route) -> &Self {
        debug!(route = %route.name(), "Adding route");
        self.state.write().routes.push(Arc::new(route));
        self
    }

    /// Appends a global middleware. The first one added is the outermost.
    pub fn use_middleware(&self, middleware: Middleware) -> &Self {
        self.state.write().middleware.push(middleware);
        self
    }

    /// Replaces the error handler.
    pub fn set_error_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&HandlerError, &MessageContext) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Arc::new(handler);
        self
    }

    /// Returns the registered routes in registration order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.state.read().routes.clone()
    }

    /// Returns the number of registered routes.
    pub fn route_count(&self) -> usize {
        self.state.read().routes.len()
    }

    /// Returns the number of global middleware.
    pub fn middleware_count(&self) -> usize {
        self.state.read().middleware.len()
    }

    fn snapshot(&self) -> (Vec<Arc<Route>>, Vec<Middleware>, ErrorHandler) {
        let state = self.state.read();
        let routes = state.routes.clone();
        let middleware = state.middleware.clone();
        drop(state);
        (routes, middleware, self.error_handler.read().clone())
    }

    /// Dispatches `ctx` to every matching route.
    ///
    /// Never fails: route errors go to the error handler.
    pub async fn handle(&self, ctx: Arc<MessageContext>) -> DispatchSummary {
        let (routes, middleware, on_error) = self.snapshot();
        let span = debug_span!(
            "dispatch",
            kind = %ctx.kind(),
            sender = ctx.sender_uin(),
            routes = routes.len()
        );

        async move {
            let mut summary = DispatchSummary {
                evaluated: routes.len(),
                ..Default::default()
            };

            for route in &routes {
                if !route.matches(&ctx) {
                    trace!(route = %route.name(), "Route skipped");
                    continue;
                }
                summary.matched += 1;

                let chain = route.chain(&middleware);
                let result = match AssertUnwindSafe(chain.oneshot(Arc::clone(&ctx)))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => Err(Box::new(HandlerPanicked::from_payload(payload.as_ref())) as BoxError),
                };
                if let Err(source) = result {
                    summary.failed += 1;
                    on_error(&HandlerError::new(route.name(), source), &*ctx);
                }
            }

            debug!(matched = summary.matched, failed = summary.failed, "Dispatch finished");
            summary
        }
        .instrument(span)
        .await
    }
}

fn log_error(err: &HandlerError, ctx: &MessageContext) {
    error!(
        route = %err.route,
        kind = %ctx.kind(),
        sender = ctx.sender_uin(),
        error = %err.source,
        "Route failed"
    );
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Router")
            .field("routes", &state.routes)
            .field("middleware", &state.middleware.len())
            .finish_non_exhaustive()
    }
}
