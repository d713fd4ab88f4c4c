//! Convenience registration and dispatch.
//!
//! [`LogicManager`] owns one [`Router`] and one [`EventBus`] and offers the
//! registration helpers bot code usually wants: routes gated on the event
//! kind, prefix commands that report themselves on the bus, and the default
//! message logging routes.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = LogicManager::new();
//! manager
//!     .use_middleware(middleware::catch_panic())
//!     .handle_command("/", "ping", handler_fn(|ctx| async move {
//!         ctx.reply_text("pong").await?;
//!         Ok(())
//!     }))
//!     .handle_group_message(greeter, [boxed(text_equals("hello", false))]);
//!
//! manager.dispatch(client, event, ExecutionScope::new()).await;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{info, warn};
use wea_core::format::{format_group_json, format_private_json};
use wea_core::{BoxedClient, ConfigurationError, EventKind, ExecutionScope, MessageContext, RawEvent};

use crate::command::{CommandSpec, EXECUTED_COMMAND_KEY, command_layer};
use crate::event_bus::{EventBus, EventType, MessageEvent};
use crate::handler::{BoxedHandler, handler_fn};
use crate::matcher::BoxedMatcher;
use crate::matcher_builders::{CommandMatcher, KindMatcher};
use crate::middleware::Middleware;
use crate::route::Route;
use crate::router::{DispatchSummary, Router};

/// Owner of a router and an event bus.
#[derive(Debug, Default)]
pub struct LogicManager {
    router: Arc<Router>,
    bus: Arc<EventBus>,
    next_route: AtomicUsize,
}

impl LogicManager {
    /// Creates a manager with an empty router and bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Returns the event bus.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Registers a route.
    pub fn add_route(&self, route: Route) -> &Self {
        self.router.add_route(route);
        self
    }

    /// Registers a global middleware.
    pub fn use_middleware(&self, middleware: Middleware) -> &Self {
        self.router.use_middleware(middleware);
        self
    }

    fn route_name(&self, label: &str) -> String {
        let n = self.next_route.fetch_add(1, Ordering::Relaxed);
        format!("{label}#{n}")
    }

    fn handle_kinds(
        &self,
        label: &str,
        kinds: KindMatcher,
        handler: BoxedHandler,
        matchers: impl IntoIterator<Item = BoxedMatcher>,
    ) -> &Self {
        let route = Route::new(self.route_name(label), handler)
            .matcher(kinds)
            .matchers(matchers);
        self.add_route(route)
    }

    /// Registers `handler` for private messages accepted by `matchers`.
    pub fn handle_private_message(
        &self,
        handler: BoxedHandler,
        matchers: impl IntoIterator<Item = BoxedMatcher>,
    ) -> &Self {
        self.handle_kinds(
            EventKind::PrivateMessage.as_str(),
            KindMatcher::new([EventKind::PrivateMessage]),
            handler,
            matchers,
        )
    }

    /// Registers `handler` for group messages accepted by `matchers`.
    pub fn handle_group_message(
        &self,
        handler: BoxedHandler,
        matchers: impl IntoIterator<Item = BoxedMatcher>,
    ) -> &Self {
        self.handle_kinds(
            EventKind::GroupMessage.as_str(),
            KindMatcher::new([EventKind::GroupMessage]),
            handler,
            matchers,
        )
    }

    /// Registers `handler` for private and group messages accepted by
    /// `matchers`.
    pub fn handle_message(
        &self,
        handler: BoxedHandler,
        matchers: impl IntoIterator<Item = BoxedMatcher>,
    ) -> &Self {
        self.handle_kinds(
            "message",
            KindMatcher::new([EventKind::PrivateMessage, EventKind::GroupMessage]),
            handler,
            matchers,
        )
    }

    /// Registers `handler` for friend requests accepted by `matchers`.
    pub fn handle_friend_request(
        &self,
        handler: BoxedHandler,
        matchers: impl IntoIterator<Item = BoxedMatcher>,
    ) -> &Self {
        self.handle_kinds(
            EventKind::FriendRequest.as_str(),
            KindMatcher::new([EventKind::FriendRequest]),
            handler,
            matchers,
        )
    }

    /// Registers a prefix command, e.g. `handle_command("/", "echo", h)`.
    ///
    /// Before `handler` runs the metadata holds `command` and
    /// `command_args`. After it succeeds `executed_command` is set and a
    /// [`MessageEvent`] is published under [`EventType::COMMAND_EXECUTED`].
    /// Listener failures are logged and do not fail the route.
    pub fn handle_command(&self, prefix: &str, name: &str, handler: BoxedHandler) -> &Self {
        let spec = CommandSpec::new(prefix, name);
        let route_name = format!("command:{}", spec.trigger());
        let route = Route::new(route_name.clone(), handler)
            .with_pattern(spec.trigger())
            .matcher(CommandMatcher::new(spec.clone()))
            .layer(command_layer(spec, route_name, Arc::clone(&self.bus)));
        self.add_route(route)
    }

    /// Builds a context for `event` and dispatches it.
    pub async fn dispatch(
        &self,
        client: BoxedClient,
        event: RawEvent,
        scope: ExecutionScope,
    ) -> DispatchSummary {
        let ctx = Arc::new(MessageContext::new(client, event).with_scope(scope));
        self.dispatch_context(ctx).await
    }

    /// Publishes [`EventType::MESSAGE_RECEIVED`] for `ctx`, then runs the
    /// router.
    ///
    /// Listener failures are logged and do not prevent routing.
    pub async fn dispatch_context(&self, ctx: Arc<MessageContext>) -> DispatchSummary {
        let event = MessageEvent::new(EventType::MESSAGE_RECEIVED, Arc::clone(&ctx));
        if let Err(error) = self
            .bus
            .publish(&EventType::MESSAGE_RECEIVED, Arc::new(event), ctx.scope())
            .await
        {
            warn!(kind = %ctx.kind(), %error, "Message listener failed");
        }
        self.router.handle(ctx).await
    }

    /// Registers routes that log every private and group message as JSON,
    /// and a listener that logs executed commands.
    pub fn install_default_logging(&self) -> &Self {
        self.handle_private_message(
            handler_fn(|ctx| async move {
                if let Some(msg) = ctx.private_message() {
                    let json = format_private_json(msg)?;
                    info!(message = %json, "Private message received");
                }
                Ok(())
            }),
            [],
        );
        self.handle_group_message(
            handler_fn(|ctx| async move {
                if let Some(msg) = ctx.group_message() {
                    let json = format_group_json(msg)?;
                    info!(group = msg.group_uin, message = %json, "Group message received");
                }
                Ok(())
            }),
            [],
        );
        self.bus
            .subscribe(EventType::COMMAND_EXECUTED, |_scope, event| async move {
                if let Some(event) = event.downcast_ref::<MessageEvent>() {
                    info!(
                        command = %event.context.get_string(EXECUTED_COMMAND_KEY),
                        "Command executed"
                    );
                }
                Ok(())
            });
        self
    }
}

// ============================================================================
// Process-wide manager
// ============================================================================

static GLOBAL: OnceLock<Arc<LogicManager>> = OnceLock::new();

/// Installs the process-wide manager. Fails if one is already installed.
pub fn install_global(manager: Arc<LogicManager>) -> Result<(), ConfigurationError> {
    GLOBAL
        .set(manager)
        .map_err(|_| ConfigurationError::AlreadyInitialized("logic manager"))
}

/// Returns the process-wide manager. Fails if none was installed.
pub fn global() -> Result<Arc<LogicManager>, ConfigurationError> {
    GLOBAL
        .get()
        .cloned()
        .ok_or(ConfigurationError::NotInitialized("logic manager"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::command::{COMMAND_ARGS_KEY, COMMAND_KEY};
    use crate::error::BoxError;
    use crate::matcher::boxed;
    use crate::matcher_builders::from_user;
    use crate::testing::{MockClient, Sent, friend_request, group_message, private_message};

    fn counter(calls: &Arc<AtomicUsize>) -> BoxedHandler {
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
    async fn test_kind_routes() {
        let manager = LogicManager::new();
        let private = Arc::new(AtomicUsize::new(0));
        let group = Arc::new(AtomicUsize::new(0));
        let any = Arc::new(AtomicUsize::new(0));
        let friend = Arc::new(AtomicUsize::new(0));
        manager
            .handle_private_message(counter(&private), [boxed(from_user(1))])
            .handle_group_message(counter(&group), [])
            .handle_message(counter(&any), [])
            .handle_friend_request(counter(&friend), []);

        let client = MockClient::new();
        let scope = ExecutionScope::new;
        manager.dispatch(client.clone(), private_message(1, "a"), scope()).await;
        manager.dispatch(client.clone(), private_message(2, "b"), scope()).await;
        manager.dispatch(client.clone(), group_message(500, 1, "c"), scope()).await;
        manager.dispatch(client, friend_request(3), scope()).await;

        assert_eq!(private.load(Ordering::SeqCst), 1);
        assert_eq!(group.load(Ordering::SeqCst), 1);
        assert_eq!(any.load(Ordering::SeqCst), 3);
        assert_eq!(friend.load(Ordering::SeqCst), 1);
        assert_eq!(manager.router().route_count(), 4);
    }

    #[tokio::test]
    async fn test_command_sets_metadata_and_publishes() {
        let manager = LogicManager::new();
        manager.handle_command(
            "/",
            "echo",
            handler_fn(|ctx| async move {
                assert_eq!(ctx.get_string(COMMAND_KEY), "echo");
                assert!(!ctx.contains(EXECUTED_COMMAND_KEY));
                let args = ctx.get_as::<Vec<String>>(COMMAND_ARGS_KEY).unwrap_or_default();
                ctx.reply_text(args.join(" ")).await?;
                Ok(())
            }),
        );

        let executed = Arc::new(Mutex::new(Vec::new()));
        {
            let executed = executed.clone();
            manager
                .event_bus()
                .subscribe(EventType::COMMAND_EXECUTED, move |_scope, event| {
                    let executed = executed.clone();
                    async move {
                        if let Some(event) = event.downcast_ref::<MessageEvent>() {
                            executed.lock().push((
                                event.context.get_string(EXECUTED_COMMAND_KEY),
                                event.route.clone(),
                            ));
                        }
                        Ok(())
                    }
                });
        }

        let client = MockClient::new();
        let summary = manager
            .dispatch(client.clone(), group_message(500, 1, "/echo a \"b c\""), ExecutionScope::new())
            .await;
        manager
            .dispatch(client.clone(), group_message(500, 1, "/echoes"), ExecutionScope::new())
            .await;

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            *client.sent.lock(),
            vec![Sent::Group(500, vec![wea_core::Element::text("a b c")])]
        );
        assert_eq!(
            *executed.lock(),
            vec![("echo".to_string(), Some("command:/echo".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_failed_command_is_not_published() {
        let manager = LogicManager::new();
        manager.handle_command(
            "!",
            "fail",
            handler_fn(|_ctx| async { Err::<(), BoxError>("nope".into()) }),
        );
        let published = Arc::new(AtomicUsize::new(0));
        {
            let published = published.clone();
            manager
                .event_bus()
                .subscribe(EventType::COMMAND_EXECUTED, move |_scope, _event| {
                    published.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                });
        }

        let summary = manager
            .dispatch(MockClient::new(), private_message(1, "!fail"), ExecutionScope::new())
            .await;
        assert_eq!(summary.failed, 1);
        assert_eq!(published.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listener_errors_do_not_fail_routes() {
        let manager = LogicManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        manager.handle_command("/", "ok", counter(&calls));
        for tag in [EventType::MESSAGE_RECEIVED, EventType::COMMAND_EXECUTED] {
            manager
                .event_bus()
                .subscribe(tag, |_scope, _event| async { Err::<(), BoxError>("listener".into()) });
        }

        let summary = manager
            .dispatch(MockClient::new(), private_message(1, "/ok"), ExecutionScope::new())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_default_logging_routes() {
        let manager = LogicManager::new();
        manager.install_default_logging();
        assert_eq!(manager.router().route_count(), 2);
        assert_eq!(manager.event_bus().subscriber_count(&EventType::COMMAND_EXECUTED), 1);

        let summary = manager
            .dispatch(MockClient::new(), group_message(500, 1, "hi"), ExecutionScope::new())
            .await;
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_global_install_once() {
        assert!(matches!(
            global(),
            Err(ConfigurationError::NotInitialized(_))
        ));
        let manager = Arc::new(LogicManager::new());
        install_global(manager.clone()).unwrap();
        assert!(Arc::ptr_eq(&global().unwrap(), &manager));
        assert!(matches!(
            install_global(Arc::new(LogicManager::new())),
            Err(ConfigurationError::AlreadyInitialized(_))
        ));
    }
}
