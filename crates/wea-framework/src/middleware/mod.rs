//! Middleware: transforms from one handler to another.
//!
//! A [`Middleware`] is an object-safe tower [`Layer`] mapping a
//! [`BoxedHandler`] to a new `BoxedHandler`. It may run code before and after
//! the wrapped handler, replace its result, or not call it at all. A
//! middleware that never calls its inner handler ends the chain for that
//! route without error.
//!
//! # Composition
//!
//! Given global middleware `[G1, G2]` and route middleware `[L1, L2]`, the
//! executed chain is
//!
//! ```text
//! G1 → G2 → L1 → L2 → handler → L2 → L1 → G2 → G1
//! ```
//!
//! Route middleware is applied to the handler first (innermost) and global
//! middleware wraps the result (outermost).
//!
//! # Writing middleware
//!
//! ```rust,ignore
//! let audit = middleware::from_fn(|ctx, next| async move {
//!     ctx.set("audited", true);
//!     next.run(ctx).await
//! });
//!
//! let limited = middleware::from_layer(tower::limit::ConcurrencyLimitLayer::new(4));
//! ```

mod builtin;

pub use builtin::{catch_panic, logging, respect_scope, timeout};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceExt};
use tower_layer::Layer;
use wea_core::MessageContext;

use crate::error::{BoxError, HandlerResult};
use crate::handler::BoxedHandler;

/// A shared, type-erased middleware.
pub type Middleware = Arc<dyn Layer<BoxedHandler, Service = BoxedHandler> + Send + Sync>;

/// Wraps `handler` with `middleware`, the first entry outermost.
pub fn compose(middleware: &[Middleware], handler: BoxedHandler) -> BoxedHandler {
    middleware
        .iter()
        .rev()
        .fold(handler, |inner, layer| layer.layer(inner))
}

// ============================================================================
// from_fn
// ============================================================================

/// The rest of the chain, handed to a [`from_fn`] middleware.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the rest of the chain.
    pub async fn run(self, ctx: Arc<MessageContext>) -> HandlerResult {
        self.inner.oneshot(ctx).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Creates a middleware from an async closure.
///
/// The closure receives the context and a [`Next`]; calling
/// [`Next::run`] continues the chain.
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Arc<MessageContext>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FromFnLayer { f })
}

#[derive(Clone)]
struct FromFnLayer<F> {
    f: F,
}

impl<F, Fut> Layer<BoxedHandler> for FromFnLayer<F>
where
    F: Fn(Arc<MessageContext>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    type Service = BoxedHandler;

    fn layer(&self, inner: BoxedHandler) -> Self::Service {
        BoxCloneSyncService::new(FromFn {
            f: self.f.clone(),
            inner,
        })
    }
}

#[derive(Clone)]
struct FromFn<F> {
    f: F,
    inner: BoxedHandler,
}

impl<F, Fut> Service<Arc<MessageContext>> for FromFn<F>
where
    F: Fn(Arc<MessageContext>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, HandlerResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<MessageContext>) -> Self::Future {
        let next = Next {
            inner: self.inner.clone(),
        };
        Box::pin((self.f)(ctx, next))
    }
}

// ============================================================================
// from_layer
// ============================================================================

/// Adapts any tower layer into a [`Middleware`].
///
/// The layer's service errors are boxed, so layers such as
/// `tower::timeout::TimeoutLayer` can be used directly.
pub fn from_layer<L>(layer: L) -> Middleware
where
    L: Layer<BoxedHandler> + Send + Sync + 'static,
    L::Service: Service<Arc<MessageContext>, Response = ()> + Clone + Send + Sync + 'static,
    <L::Service as Service<Arc<MessageContext>>>::Error: Into<BoxError>,
    <L::Service as Service<Arc<MessageContext>>>::Future: Send + 'static,
{
    Arc::new(ErasedLayer { layer })
}

struct ErasedLayer<L> {
    layer: L,
}

impl<L> Layer<BoxedHandler> for ErasedLayer<L>
where
    L: Layer<BoxedHandler> + Send + Sync + 'static,
    L::Service: Service<Arc<MessageContext>, Response = ()> + Clone + Send + Sync + 'static,
    <L::Service as Service<Arc<MessageContext>>>::Error: Into<BoxError>,
    <L::Service as Service<Arc<MessageContext>>>::Future: Send + 'static,
{
    type Service = BoxedHandler;

    fn layer(&self, inner: BoxedHandler) -> Self::Service {
        BoxCloneSyncService::new(self.layer.layer(inner).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tower_layer::layer_fn;

    use crate::handler::handler_fn;
    use crate::testing::{MockClient, context, private_message};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
        let log = log.clone();
        from_fn(move |ctx, next| {
            let log = log.clone();
            async move {
                log.lock().push(format!("{name}:before"));
                let result = next.run(ctx).await;
                log.lock().push(format!("{name}:after"));
                result
            }
        })
    }

    #[tokio::test]
    async fn test_compose_first_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let log = log.clone();
            handler_fn(move |_ctx| {
                let log = log.clone();
                async move {
                    log.lock().push("handler".to_string());
                    Ok(())
                }
            })
        };

        let chain = compose(&[recorder(&log, "A"), recorder(&log, "B")], handler);
        chain
            .oneshot(context(MockClient::new(), private_message(1, "x")))
            .await
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec!["A:before", "B:before", "handler", "B:after", "A:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let stop = from_fn(|_ctx, _next| async { Ok(()) });
        let handler = handler_fn(|_ctx| async { Err::<(), BoxError>("unreachable".into()) });

        let chain = compose(&[stop], handler);
        let result = chain
            .oneshot(context(MockClient::new(), private_message(1, "x")))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_from_layer_accepts_plain_layers() {
        let tag = from_layer(layer_fn(|inner: BoxedHandler| {
            tower::service_fn(move |ctx: Arc<MessageContext>| {
                ctx.set("tagged", true);
                inner.clone().oneshot(ctx)
            })
        }));
        let handler = handler_fn(|ctx: Arc<MessageContext>| async move {
            assert_eq!(ctx.get_as::<bool>("tagged").as_deref(), Some(&true));
            Ok(())
        });

        let ctx = context(MockClient::new(), private_message(1, "x"));
        compose(&[tag], handler).oneshot(ctx).await.unwrap();
    }
}
