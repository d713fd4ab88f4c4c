//! The event loop.
//!
//! [`WeaRuntime`] ties together a configuration, a [`Client`] and a
//! [`LogicManager`], and pumps a stream of [`RawEvent`]s through the
//! manager. Every event is dispatched on its own tokio task with a fresh
//! [`ExecutionScope`]; the scope is a child of the runtime's shutdown token
//! and carries the configured deadline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let runtime = WeaRuntime::builder()
//!     .client(client)
//!     .build()?;
//!
//! runtime.command("ping", handler_fn(|ctx| async move {
//!     ctx.reply_text("pong").await?;
//!     Ok(())
//! }));
//!
//! runtime.run(events).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Stream, StreamExt};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wea_core::{BoxedClient, ConfigurationError, ExecutionScope, RawEvent};
use wea_framework::{BoxedHandler, DispatchSummary, LogicManager, Middleware};

use crate::config::{ConfigLoader, WeaConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

// =============================================================================
// Statistics
// =============================================================================

/// Counters since the runtime was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Events taken from the stream.
    pub received: u64,
    /// Events whose dispatch finished.
    pub dispatched: u64,
    /// Route executions, summed over all events.
    pub matched: u64,
    /// Failed route executions, summed over all events.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct StatsCounter {
    received: AtomicU64,
    dispatched: AtomicU64,
    matched: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounter {
    fn record(&self, summary: DispatchSummary) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.matched
            .fetch_add(summary.matched as u64, Ordering::Relaxed);
        self.failed
            .fetch_add(summary.failed as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            received: self.received.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// WeaRuntime
// =============================================================================

/// The runtime.
pub struct WeaRuntime {
    config: WeaConfig,
    client: BoxedClient,
    manager: Arc<LogicManager>,
    shutdown: CancellationToken,
    stats: Arc<StatsCounter>,
}

impl WeaRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WeaConfig {
        &self.config
    }

    /// Returns the client events are answered through.
    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// Returns the logic manager.
    pub fn manager(&self) -> &Arc<LogicManager> {
        &self.manager
    }

    /// Returns the counters.
    pub fn stats(&self) -> RuntimeStats {
        self.stats.snapshot()
    }

    /// Registers a command using the configured prefix.
    pub fn command(&self, name: &str, handler: BoxedHandler) -> &Self {
        self.manager
            .handle_command(&self.config.dispatch.command_prefix, name, handler);
        self
    }

    /// Registers a global middleware.
    pub fn use_middleware(&self, middleware: Middleware) -> &Self {
        self.manager.use_middleware(middleware);
        self
    }

    /// Asks a running [`run`](Self::run) to stop and cancels the scopes of
    /// events in flight.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Creates the scope for one event.
    fn event_scope(&self) -> ExecutionScope {
        let scope = ExecutionScope::from_token(self.shutdown.child_token());
        match self.config.dispatch.deadline() {
            Some(deadline) => scope.with_timeout(deadline),
            None => scope,
        }
    }

    /// Dispatches one event on the current task.
    pub async fn dispatch(&self, event: RawEvent) -> DispatchSummary {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        let summary = self
            .manager
            .dispatch(Arc::clone(&self.client), event, self.event_scope())
            .await;
        self.stats.record(summary);
        summary
    }

    /// Runs until `events` ends, Ctrl+C (or SIGTERM) arrives, or
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn run<S>(&self, events: S) -> RuntimeResult<()>
    where
        S: Stream<Item = RawEvent> + Send,
    {
        info!("WEA runtime is now running. Press Ctrl+C to stop.");
        self.run_until(events, wait_for_signal()).await
    }

    /// Like [`run`](Self::run) but stops when `signal` completes instead of
    /// on process signals.
    pub async fn run_until<S, F>(&self, events: S, signal: F) -> RuntimeResult<()>
    where
        S: Stream<Item = RawEvent> + Send,
        F: Future<Output = ()>,
    {
        let mut events = std::pin::pin!(events);
        let mut signal = std::pin::pin!(signal);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                () = &mut signal => {
                    info!("Shutdown signal received");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => self.spawn_dispatch(&mut tasks, event),
                    None => {
                        info!("Event stream ended");
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join(joined);
                }
            }
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight events");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        let stats = self.stats();
        info!(
            received = stats.received,
            dispatched = stats.dispatched,
            failed = stats.failed,
            "WEA runtime stopped"
        );
        Ok(())
    }

    fn spawn_dispatch(&self, tasks: &mut JoinSet<()>, event: RawEvent) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let manager = Arc::clone(&self.manager);
        let client = Arc::clone(&self.client);
        let stats = Arc::clone(&self.stats);
        let scope = self.event_scope();
        tasks.spawn(async move {
            let summary = manager.dispatch(client, event, scope).await;
            stats.record(summary);
        });
    }
}

impl std::fmt::Debug for WeaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaRuntime")
            .field("config", &self.config)
            .field("manager", &self.manager)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "Dispatch task failed");
    }
}

/// Completes on Ctrl+C, or SIGTERM on unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(err) => {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`WeaRuntime`].
///
/// Unless [`config`](Self::config) is given, the configuration is loaded
/// with a [`ConfigLoader`] that searches the current directory.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<WeaConfig>,
    client: Option<BoxedClient>,
    manager: Option<Arc<LogicManager>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            client: None,
            manager: None,
            init_logging: true,
        }
    }

    /// Uses `config` instead of loading one.
    pub fn config(mut self, config: WeaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Sets the client. Required.
    pub fn client(mut self, client: BoxedClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Uses an existing manager instead of a fresh one.
    pub fn manager(mut self, manager: Arc<LogicManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Whether `build` installs the global subscriber (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Builds the runtime.
    ///
    /// Fails with [`ConfigurationError::Missing`] when no client was set.
    pub fn build(self) -> RuntimeResult<WeaRuntime> {
        let client = self.client.ok_or(ConfigurationError::Missing("client"))?;
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let manager = self.manager.unwrap_or_default();
        if config.dispatch.default_logging {
            manager.install_default_logging();
        }

        info!(
            self_uin = client.self_uin(),
            log_level = %config.logging.level,
            command_prefix = %config.dispatch.command_prefix,
            deadline_ms = ?config.dispatch.deadline_ms,
            routes = manager.router().route_count(),
            "Runtime initialized from configuration"
        );

        Ok(WeaRuntime {
            config,
            client,
            manager,
            shutdown: CancellationToken::new(),
            stats: Arc::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};
    use wea_core::{Client, ClientResult, Element, GroupMessage, PrivateMessage, Sender};
    use wea_framework::{BoxError, handler_fn};

    use crate::error::RuntimeError;

    #[derive(Default)]
    struct MockClient {
        sent: Mutex<Vec<(u32, Vec<Element>)>>,
    }

    #[async_trait]
    impl Client for MockClient {
        fn self_uin(&self) -> u32 {
            10000
        }

        async fn send_private_message(&self, user_uin: u32, elements: Vec<Element>) -> ClientResult<()> {
            self.sent.lock().push((user_uin, elements));
            Ok(())
        }

        async fn send_group_message(&self, group_uin: u32, elements: Vec<Element>) -> ClientResult<()> {
            self.sent.lock().push((group_uin, elements));
            Ok(())
        }
    }

    fn private(uin: u32, text: &str) -> RawEvent {
        PrivateMessage {
            id: 1,
            time: 0,
            sender: Sender {
                uin,
                ..Default::default()
            },
            self_uin: 10000,
            elements: vec![Element::text(text)],
        }
        .into()
    }

    fn group(group_uin: u32, text: &str) -> RawEvent {
        GroupMessage {
            id: 1,
            time: 0,
            group_uin,
            group_name: String::new(),
            sender: Sender::default(),
            elements: vec![Element::text(text)],
        }
        .into()
    }

    fn quiet_config() -> WeaConfig {
        let mut config = WeaConfig::default();
        config.dispatch.default_logging = false;
        config
    }

    fn runtime(client: Arc<MockClient>, config: WeaConfig) -> WeaRuntime {
        assert_ok!(
            WeaRuntime::builder()
                .config(config)
                .client(client)
                .init_logging(false)
                .build()
        )
    }

    #[test]
    fn test_missing_client() {
        let err = assert_err!(WeaRuntime::builder().config(quiet_config()).init_logging(false).build());
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::Missing("client"))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = quiet_config();
        config.dispatch.deadline_ms = Some(0);
        let err = assert_err!(
            WeaRuntime::builder()
                .config(config)
                .client(Arc::new(MockClient::default()))
                .init_logging(false)
                .build()
        );
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_default_logging_installed() {
        let rt = runtime(Arc::new(MockClient::default()), WeaConfig::default());
        assert_eq!(rt.manager().router().route_count(), 2);
    }

    #[tokio::test]
    async fn test_run_dispatches_every_event() {
        let client = Arc::new(MockClient::default());
        let mut config = quiet_config();
        config.dispatch.command_prefix = "!".into();
        let rt = runtime(client.clone(), config);
        rt.command(
            "ping",
            handler_fn(|ctx| async move {
                ctx.reply_text("pong").await?;
                Ok(())
            }),
        );

        let events = futures::stream::iter(vec![
            private(1, "!ping"),
            group(500, "!ping"),
            private(2, "/ping"),
        ]);
        rt.run_until(events, std::future::pending()).await.unwrap();

        let mut sent: Vec<u32> = client.sent.lock().iter().map(|(to, _)| *to).collect();
        sent.sort();
        assert_eq!(sent, vec![1, 500]);
        assert_eq!(
            rt.stats(),
            RuntimeStats {
                received: 3,
                dispatched: 3,
                matched: 2,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let rt = runtime(Arc::new(MockClient::default()), quiet_config());
        rt.manager().handle_message(
            handler_fn(|_ctx| async { Err::<(), BoxError>("nope".into()) }),
            [],
        );

        let summary = rt.dispatch(private(1, "x")).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(rt.stats().failed, 1);
        assert_eq!(rt.stats().received, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_pending_stream() {
        let rt = Arc::new(runtime(Arc::new(MockClient::default()), quiet_config()));
        let stopper = rt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stopper.shutdown();
        });

        let events = futures::stream::pending::<RawEvent>();
        rt.run_until(events, std::future::pending()).await.unwrap();
        assert!(rt.is_shutdown());
        assert_eq!(rt.stats().received, 0);
    }

    #[tokio::test]
    async fn test_event_scope_carries_deadline() {
        let mut config = quiet_config();
        config.dispatch.deadline_ms = Some(5_000);
        let rt = runtime(Arc::new(MockClient::default()), config);

        let seen = Arc::new(Mutex::new(None));
        {
            let seen = seen.clone();
            rt.manager().handle_message(
                handler_fn(move |ctx| {
                    let seen = seen.clone();
                    async move {
                        *seen.lock() = ctx.scope().remaining();
                        Ok(())
                    }
                }),
                [],
            );
        }

        rt.dispatch(private(1, "x")).await;
        let remaining = (*seen.lock()).expect("deadline set");
        assert!(remaining <= Duration::from_millis(5_000));
        assert!(remaining > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_event_scopes() {
        let rt = runtime(Arc::new(MockClient::default()), quiet_config());
        let scope = rt.event_scope();
        assert!(!scope.is_cancelled());
        rt.shutdown();
        assert!(scope.is_cancelled());
    }
}
