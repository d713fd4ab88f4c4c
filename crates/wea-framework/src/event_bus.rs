//! A small tagged publish/subscribe bus.
//!
//! Subscribers register under an [`EventType`] tag. [`EventBus::publish`]
//! runs the subscribers of one tag on the caller's task, one after another
//! in registration order, and stops at the first error. Unlike route
//! failures, which the router reports and moves past, a subscriber error is
//! returned to the publisher.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::trace;
use wea_core::{ExecutionScope, MessageContext};

use crate::error::{BoxError, EventBusError};

// ============================================================================
// Events
// ============================================================================

/// Tag identifying a kind of bus event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// A command route finished successfully.
    pub const COMMAND_EXECUTED: Self = Self::from_static("command_executed");
    /// An event entered [`LogicManager::dispatch`](crate::LogicManager::dispatch).
    pub const MESSAGE_RECEIVED: Self = Self::from_static("message_received");

    /// Creates a tag from a static string.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Creates a tag from an owned string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// Returns the tag as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value that can travel over the bus.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// Returns the tag this event is normally published under.
    fn event_type(&self) -> EventType;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Event {
    /// Downcasts to a concrete event type.
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A shared, type-erased event.
pub type BoxedEvent = Arc<dyn Event>;

/// An event about a message being dispatched.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    event_type: EventType,
    /// The dispatch context, with its metadata as it was at publish time.
    pub context: Arc<MessageContext>,
    /// The route that produced the event, if any.
    pub route: Option<String>,
}

impl MessageEvent {
    /// Creates a message event.
    pub fn new(event_type: EventType, context: Arc<MessageContext>) -> Self {
        Self {
            event_type,
            context,
            route: None,
        }
    }

    /// Records the route that produced the event.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }
}

impl Event for MessageEvent {
    fn event_type(&self) -> EventType {
        self.event_type.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Identifies one subscription, for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber =
    Arc<dyn Fn(ExecutionScope, BoxedEvent) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// The event bus.
///
/// # Example
///
/// ```rust,ignore
/// bus.subscribe(EventType::COMMAND_EXECUTED, |_scope, event| async move {
///     if let Some(event) = event.downcast_ref::<MessageEvent>() {
///         info!(command = %event.context.get_string("executed_command"), "Command executed");
///     }
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<EventType, Vec<(SubscriptionId, Subscriber)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` under `tag`, after the existing ones.
    pub fn subscribe<F, Fut>(&self, tag: EventType, subscriber: F) -> SubscriptionId
    where
        F: Fn(ExecutionScope, BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber: Subscriber = Arc::new(
            move |scope: ExecutionScope, event: BoxedEvent| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(subscriber(scope, event))
            },
        );
        trace!(%tag, ?id, "Subscribing");
        self.subscribers
            .write()
            .entry(tag)
            .or_default()
            .push((id, subscriber));
        id
    }

    /// Removes a subscription. Returns false if it was not registered under
    /// `tag`.
    pub fn unsubscribe(&self, tag: &EventType, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(tag) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(tag);
        }
        removed
    }

    /// Returns the number of subscribers registered under `tag`.
    pub fn subscriber_count(&self, tag: &EventType) -> usize {
        self.subscribers.read().get(tag).map_or(0, Vec::len)
    }

    /// Delivers `event` to every subscriber of `tag`.
    ///
    /// Subscribers are awaited one by one in registration order. The first
    /// error is returned immediately and the remaining subscribers are not
    /// invoked. Publishing to a tag without subscribers succeeds.
    pub async fn publish(
        &self,
        tag: &EventType,
        event: BoxedEvent,
        scope: &ExecutionScope,
    ) -> Result<(), EventBusError> {
        let subscribers: Vec<Subscriber> = match self.subscribers.read().get(tag) {
            Some(list) => list.iter().map(|(_, s)| Arc::clone(s)).collect(),
            None => return Ok(()),
        };

        trace!(%tag, subscribers = subscribers.len(), "Publishing");
        for (index, subscriber) in subscribers.iter().enumerate() {
            subscriber(scope.clone(), Arc::clone(&event))
                .await
                .map_err(|source| EventBusError::Subscriber {
                    tag: tag.clone(),
                    index,
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let mut map = f.debug_map();
        for (tag, list) in subscribers.iter() {
            map.entry(&tag.as_str(), &list.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio_test::assert_err;

    use crate::testing::{MockClient, context, private_message};

    fn event() -> BoxedEvent {
        let ctx = context(MockClient::new(), private_message(1, "x"));
        Arc::new(MessageEvent::new(EventType::MESSAGE_RECEIVED, ctx))
    }

    fn push(bus: &EventBus, log: &Arc<Mutex<Vec<usize>>>, n: usize, fail: bool) -> SubscriptionId {
        let log = log.clone();
        bus.subscribe(EventType::MESSAGE_RECEIVED, move |_scope, _event| {
            let log = log.clone();
            async move {
                log.lock().push(n);
                if fail {
                    Err(format!("subscriber {n} failed").into())
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            push(&bus, &log, n, false);
        }

        bus.publish(&EventType::MESSAGE_RECEIVED, event(), &ExecutionScope::new())
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_publish_stops_at_first_error() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        push(&bus, &log, 0, false);
        push(&bus, &log, 1, true);
        push(&bus, &log, 2, false);

        let err = assert_err!(
            bus.publish(&EventType::MESSAGE_RECEIVED, event(), &ExecutionScope::new())
                .await
        );

        assert_eq!(*log.lock(), vec![0, 1]);
        let EventBusError::Subscriber { tag, index, source } = err;
        assert_eq!(tag, EventType::MESSAGE_RECEIVED);
        assert_eq!(index, 1);
        assert_eq!(source.to_string(), "subscriber 1 failed");
    }

    #[tokio::test]
    async fn test_other_tags_and_empty_tags() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        push(&bus, &log, 0, false);

        bus.publish(&EventType::COMMAND_EXECUTED, event(), &ExecutionScope::new())
            .await
            .unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = push(&bus, &log, 0, false);
        push(&bus, &log, 1, false);
        assert_eq!(bus.subscriber_count(&EventType::MESSAGE_RECEIVED), 2);

        assert!(bus.unsubscribe(&EventType::MESSAGE_RECEIVED, first));
        assert!(!bus.unsubscribe(&EventType::MESSAGE_RECEIVED, first));
        assert_eq!(bus.subscriber_count(&EventType::MESSAGE_RECEIVED), 1);

        bus.publish(&EventType::MESSAGE_RECEIVED, event(), &ExecutionScope::new())
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_subscriber_receives_scope_and_event() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = seen.clone();
            bus.subscribe(EventType::MESSAGE_RECEIVED, move |scope, event| {
                let seen = seen.clone();
                async move {
                    let uin = event
                        .downcast_ref::<MessageEvent>()
                        .map(|event| event.context.sender_uin());
                    *seen.lock() = Some((scope.is_cancelled(), uin));
                    Ok(())
                }
            });
        }

        let scope = ExecutionScope::new();
        scope.cancel();
        bus.publish(&EventType::MESSAGE_RECEIVED, event(), &scope)
            .await
            .unwrap();
        assert_eq!(*seen.lock(), Some((true, Some(1))));
    }
}
