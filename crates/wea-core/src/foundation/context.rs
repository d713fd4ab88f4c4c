//! The per-event dispatch context.
//!
//! This module provides [`MessageContext`], the envelope every matcher,
//! middleware and handler receives for one inbound event.
//!
//! # Shared metadata
//!
//! One `MessageContext` is created per event and the **same** instance is
//! handed to every route evaluated for that event. The metadata bag is
//! therefore shared: a value set by one route's handler is visible to every
//! route evaluated after it, and to event bus listeners that receive the
//! context. Routes that need private state must namespace their keys.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ClientError, ClientResult};
use crate::foundation::event::{EventKind, FriendRequest, GroupMessage, PrivateMessage, RawEvent};
use crate::foundation::message::{Element, extract_text};
use crate::foundation::scope::ExecutionScope;
use crate::integration::BoxedClient;

/// A value stored in the metadata bag.
pub type MetaValue = Arc<dyn Any + Send + Sync>;

/// The context object passed through matchers, middleware and handlers.
///
/// `MessageContext` is shared as `Arc<MessageContext>` during dispatch, so
/// the metadata bag uses interior mutability and every accessor takes
/// `&self`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handle(ctx: Arc<MessageContext>) -> HandlerResult {
///     if let Some(msg) = ctx.group_message() {
///         ctx.set("seen_group", msg.group_uin);
///     }
///     let who = ctx.get_string("nickname"); // "" when unset
///     ctx.reply(vec![Element::text(format!("hi {who}"))]).await?;
///     Ok(())
/// }
/// ```
pub struct MessageContext {
    /// Connection that delivered the event.
    client: BoxedClient,
    /// The event being dispatched.
    event: RawEvent,
    /// Annotations shared by everything that sees this context.
    metadata: RwLock<HashMap<String, MetaValue>>,
    /// Cancellation and deadline for long-running work.
    scope: ExecutionScope,
}

impl MessageContext {
    /// Creates a context for `event` received through `client`.
    ///
    /// The context starts with an empty metadata bag and an open
    /// [`ExecutionScope`].
    pub fn new(client: BoxedClient, event: RawEvent) -> Self {
        Self {
            client,
            event,
            metadata: RwLock::new(HashMap::new()),
            scope: ExecutionScope::new(),
        }
    }

    /// Attaches an execution scope, replacing the default one.
    pub fn with_scope(mut self, scope: ExecutionScope) -> Self {
        self.scope = scope;
        self
    }

    // ─── Event access ───────────────────────────────────────────────────────

    /// Returns the client that delivered the event.
    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// Returns the raw event.
    pub fn event(&self) -> &RawEvent {
        &self.event
    }

    /// Returns the kind of the raw event.
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Returns the attached execution scope.
    pub fn scope(&self) -> &ExecutionScope {
        &self.scope
    }

    /// Returns the private message, if this event is one.
    pub fn private_message(&self) -> Option<&PrivateMessage> {
        self.event.as_private_message()
    }

    /// Returns the group message, if this event is one.
    pub fn group_message(&self) -> Option<&GroupMessage> {
        self.event.as_group_message()
    }

    /// Returns the friend request, if this event is one.
    pub fn friend_request(&self) -> Option<&FriendRequest> {
        self.event.as_friend_request()
    }

    /// Returns the uin of the user that caused this event.
    pub fn sender_uin(&self) -> u32 {
        self.event.sender_uin()
    }

    /// Returns the plain text of a private or group message.
    ///
    /// Only text elements are concatenated; for friend requests, or messages
    /// without text, this is the empty string.
    pub fn message_text(&self) -> String {
        self.event
            .elements()
            .map(extract_text)
            .unwrap_or_default()
    }

    // ─── Metadata ───────────────────────────────────────────────────────────

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.metadata.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<MetaValue> {
        self.metadata.read().get(key).cloned()
    }

    /// Returns the value stored under `key` if it has type `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns the textual value stored under `key`.
    ///
    /// Both `String` and `&'static str` values count as text. An absent key
    /// and a non-textual value both yield the empty string.
    pub fn get_string(&self, key: &str) -> String {
        let guard = self.metadata.read();
        let Some(value) = guard.get(key) else {
            return String::new();
        };
        if let Some(s) = value.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = value.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else {
            String::new()
        }
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.metadata.read().contains_key(key)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&self, key: &str) -> Option<MetaValue> {
        self.metadata.write().remove(key)
    }

    /// Returns the keys currently in the metadata bag, in no particular order.
    pub fn metadata_keys(&self) -> Vec<String> {
        self.metadata.read().keys().cloned().collect()
    }

    // ─── Replying ───────────────────────────────────────────────────────────

    /// Sends `elements` back to the conversation the event came from.
    ///
    /// Private messages are answered to the sender, group messages to the
    /// group. Friend requests have no conversation and fail with
    /// [`ClientError::NoReplyTarget`].
    pub async fn reply(&self, elements: Vec<Element>) -> ClientResult<()> {
        match &self.event {
            RawEvent::PrivateMessage(msg) => {
                self.client
                    .send_private_message(msg.sender.uin, elements)
                    .await
            }
            RawEvent::GroupMessage(msg) => {
                self.client.send_group_message(msg.group_uin, elements).await
            }
            RawEvent::FriendRequest(_) => Err(ClientError::NoReplyTarget { kind: self.kind() }),
        }
    }

    /// Replies with a single text element.
    pub async fn reply_text(&self, text: impl Into<String>) -> ClientResult<()> {
        self.reply(vec![Element::text(text)]).await
    }
}

impl std::fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("kind", &self.kind())
            .field("sender_uin", &self.sender_uin())
            .field("metadata_len", &self.metadata.read().len())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::Sender;
    use crate::integration::Client;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<(&'static str, u32, Vec<Element>)>>,
    }

    #[async_trait]
    impl Client for RecordingClient {
        fn self_uin(&self) -> u32 {
            10000
        }

        async fn send_private_message(
            &self,
            user_uin: u32,
            elements: Vec<Element>,
        ) -> ClientResult<()> {
            self.sent.lock().push(("private", user_uin, elements));
            Ok(())
        }

        async fn send_group_message(
            &self,
            group_uin: u32,
            elements: Vec<Element>,
        ) -> ClientResult<()> {
            self.sent.lock().push(("group", group_uin, elements));
            Ok(())
        }
    }

    fn private(elements: Vec<Element>) -> RawEvent {
        PrivateMessage {
            id: 1,
            time: 0,
            sender: Sender {
                uin: 42,
                ..Default::default()
            },
            self_uin: 10000,
            elements,
        }
        .into()
    }

    fn friend_request() -> RawEvent {
        FriendRequest {
            source_uin: 7,
            source_uid: String::new(),
            source_nick: String::new(),
            message: String::new(),
            source: String::new(),
        }
        .into()
    }

    fn context(event: RawEvent) -> (Arc<RecordingClient>, MessageContext) {
        let client = Arc::new(RecordingClient::default());
        let ctx = MessageContext::new(client.clone(), event);
        (client, ctx)
    }

    #[test]
    fn test_get_string_absent_and_non_text_are_identical() {
        let (_, ctx) = context(private(vec![]));
        ctx.set("number", 5_i32);
        ctx.set("owned", String::from("value"));
        ctx.set("static", "literal");

        assert_eq!(ctx.get_string("missing"), "");
        assert_eq!(ctx.get_string("number"), "");
        assert_eq!(ctx.get_string("owned"), "value");
        assert_eq!(ctx.get_string("static"), "literal");
    }

    #[test]
    fn test_get_reports_presence() {
        let (_, ctx) = context(private(vec![]));
        assert!(ctx.get("k").is_none());
        ctx.set("k", 1_u64);
        assert!(ctx.get("k").is_some());
        assert_eq!(ctx.get_as::<u64>("k").as_deref(), Some(&1));
        assert!(ctx.get_as::<String>("k").is_none());
        assert!(ctx.remove("k").is_some());
        assert!(!ctx.contains("k"));
    }

    #[test]
    fn test_set_overwrites() {
        let (_, ctx) = context(private(vec![]));
        ctx.set("k", "first");
        ctx.set("k", "second");
        assert_eq!(ctx.get_string("k"), "second");
        assert_eq!(ctx.metadata_keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_message_text() {
        let (_, ctx) = context(private(vec![
            Element::text("a"),
            Element::image("u"),
            Element::text("b"),
        ]));
        assert_eq!(ctx.message_text(), "ab");

        let (_, ctx) = context(friend_request());
        assert_eq!(ctx.message_text(), "");
        assert!(ctx.private_message().is_none());
        assert!(ctx.friend_request().is_some());
    }

    #[tokio::test]
    async fn test_reply_targets_origin() {
        let (client, ctx) = context(private(vec![]));
        ctx.reply_text("pong").await.unwrap();

        let sent = client.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "private");
        assert_eq!(sent[0].1, 42);
        assert_eq!(sent[0].2, vec![Element::text("pong")]);
    }

    #[tokio::test]
    async fn test_reply_to_friend_request_fails() {
        let (client, ctx) = context(friend_request());
        let err = ctx.reply_text("hi").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::NoReplyTarget {
                kind: EventKind::FriendRequest
            }
        ));
        assert!(client.sent.lock().is_empty());
    }
}
