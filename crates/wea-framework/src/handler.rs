//! Handler types.
//!
//! Every route ends in a [`BoxedHandler`]: a cloneable, type-erased tower
//! service from `Arc<MessageContext>` to `()`. Handlers can be written as
//! async closures through [`handler_fn`] or as types implementing
//! [`Handler`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tower::service_fn;
use tower::util::BoxCloneSyncService;
use wea_core::MessageContext;

use crate::error::{BoxError, HandlerResult};

/// A type-erased handler service.
pub type BoxedHandler = BoxCloneSyncService<Arc<MessageContext>, (), BoxError>;

/// A handler implemented on a type.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Handler for Echo {
///     async fn handle(&self, ctx: Arc<MessageContext>) -> HandlerResult {
///         ctx.reply_text(ctx.message_text()).await?;
///         Ok(())
///     }
/// }
///
/// let route = Route::new("echo", into_handler(Echo));
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one event.
    async fn handle(&self, ctx: Arc<MessageContext>) -> HandlerResult;
}

/// Wraps an async closure into a [`BoxedHandler`].
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    BoxCloneSyncService::new(service_fn(f))
}

/// Wraps a [`Handler`] implementation into a [`BoxedHandler`].
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    let handler = Arc::new(handler);
    handler_fn(move |ctx| {
        let handler = Arc::clone(&handler);
        async move { handler.handle(ctx).await }
    })
}
