//! Routes: a handler guarded by matchers and wrapped by middleware.

use std::fmt;
use std::sync::Arc;

use tower::ServiceExt;
use tracing::trace;
use wea_core::MessageContext;

use crate::error::HandlerResult;
use crate::handler::{BoxedHandler, handler_fn};
use crate::matcher::{self, BoxedMatcher, Matcher};
use crate::middleware::{self, Middleware};

/// A handler together with the matchers that select it and the middleware
/// that wraps it.
///
/// Routes are built once and registered on a [`Router`](crate::Router),
/// which treats them as immutable from then on.
///
/// # Example
///
/// ```rust,ignore
/// let route = Route::new("greet", handler_fn(|ctx| async move {
///         ctx.reply_text("hello!").await?;
///         Ok(())
///     }))
///     .with_pattern("hello")
///     .matcher(group_message())
///     .matcher(text_equals("hello", false))
///     .layer(middleware::catch_panic());
/// ```
pub struct Route {
    name: String,
    pattern: Option<String>,
    matchers: Vec<BoxedMatcher>,
    middleware: Vec<Middleware>,
    handler: BoxedHandler,
}

impl Route {
    /// Creates a route with no matchers and no middleware.
    pub fn new(name: impl Into<String>, handler: BoxedHandler) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            matchers: Vec::new(),
            middleware: Vec::new(),
            handler,
        }
    }

    /// Creates a route from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(name, handler_fn(f))
    }

    /// Sets a descriptive pattern. It is informational only.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Adds a matcher.
    pub fn matcher<M: Matcher>(mut self, matcher: M) -> Self {
        self.matchers.push(matcher::boxed(matcher));
        self
    }

    /// Adds several already erased matchers.
    pub fn matchers(mut self, matchers: impl IntoIterator<Item = BoxedMatcher>) -> Self {
        self.matchers.extend(matchers);
        self
    }

    /// Adds a route-local middleware. The first one added is the outermost.
    pub fn layer(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the descriptive pattern, if set.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Returns the number of matchers.
    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    /// Returns the number of route-local middleware.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Returns true if every matcher accepts `ctx`.
    pub fn matches(&self, ctx: &MessageContext) -> bool {
        matcher::all_match(&self.matchers, ctx)
    }

    /// Builds the full chain: `global` outermost, then the route's own
    /// middleware, then the handler.
    pub(crate) fn chain(&self, global: &[Middleware]) -> BoxedHandler {
        let local = middleware::compose(&self.middleware, self.handler.clone());
        middleware::compose(global, local)
    }

    /// Runs this route alone, without any global middleware.
    ///
    /// Returns `Ok(())` without side effects when a matcher rejects the
    /// context; otherwise returns whatever the chain returns.
    pub async fn execute(&self, ctx: Arc<MessageContext>) -> HandlerResult {
        if !self.matches(&ctx) {
            trace!(route = %self.name, "Route skipped");
            return Ok(());
        }
        self.chain(&[]).oneshot(ctx).await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("matchers", &self.matchers.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    use crate::error::BoxError;
    use crate::testing::{MockClient, context, private_message};

    fn counting(calls: &Arc<AtomicUsize>) -> BoxedHandler {
        let calls = calls.clone();
        handler_fn(move |_ctx| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_no_matchers_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = Route::new("all", counting(&calls));

        let ctx = context(MockClient::new(), private_message(1, "x"));
        assert_ok!(route.execute(ctx).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_route_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let middleware_calls = Arc::new(AtomicUsize::new(0));
        let counter = {
            let middleware_calls = middleware_calls.clone();
            middleware::from_fn(move |ctx, next| {
                let middleware_calls = middleware_calls.clone();
                async move {
                    middleware_calls.fetch_add(1, Ordering::SeqCst);
                    next.run(ctx).await
                }
            })
        };
        let route = Route::new("never", counting(&calls))
            .matcher(|_: &MessageContext| false)
            .layer(counter);

        let ctx = context(MockClient::new(), private_message(1, "x"));
        assert_ok!(route.execute(ctx).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(middleware_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_propagates_error() {
        let route = Route::from_fn("fail", |_ctx| async {
            Err::<(), BoxError>("broken".into())
        });

        let ctx = context(MockClient::new(), private_message(1, "x"));
        let err = assert_err!(route.execute(ctx).await);
        assert_eq!(err.to_string(), "broken");
    }

    #[test]
    fn test_accessors() {
        let route = Route::from_fn("r", |_ctx| async { Ok(()) })
            .with_pattern("p")
            .matcher(|_: &MessageContext| true)
            .layer(middleware::logging());
        assert_eq!(route.name(), "r");
        assert_eq!(route.pattern(), Some("p"));
        assert_eq!(route.matcher_count(), 1);
        assert_eq!(route.middleware_count(), 1);
    }
}
