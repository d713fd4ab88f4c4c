//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use wea_core::{
    Client, ClientResult, Element, FriendRequest, GroupMessage, MessageContext, PrivateMessage,
    RawEvent, Sender,
};

pub const SELF_UIN: u32 = 10000;

/// A message recorded by [`MockClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Private(u32, Vec<Element>),
    Group(u32, Vec<Element>),
}

/// Client that records everything it is asked to send.
#[derive(Default)]
pub struct MockClient {
    pub sent: Mutex<Vec<Sent>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Client for MockClient {
    fn self_uin(&self) -> u32 {
        SELF_UIN
    }

    async fn send_private_message(&self, user_uin: u32, elements: Vec<Element>) -> ClientResult<()> {
        self.sent.lock().push(Sent::Private(user_uin, elements));
        Ok(())
    }

    async fn send_group_message(&self, group_uin: u32, elements: Vec<Element>) -> ClientResult<()> {
        self.sent.lock().push(Sent::Group(group_uin, elements));
        Ok(())
    }
}

fn sender(uin: u32) -> Sender {
    Sender {
        uin,
        nickname: format!("user{uin}"),
        ..Default::default()
    }
}

pub fn private_message(uin: u32, text: &str) -> RawEvent {
    PrivateMessage {
        id: 1,
        time: 0,
        sender: sender(uin),
        self_uin: SELF_UIN,
        elements: vec![Element::text(text)],
    }
    .into()
}

pub fn group_message(group_uin: u32, uin: u32, text: &str) -> RawEvent {
    GroupMessage {
        id: 1,
        time: 0,
        group_uin,
        group_name: format!("group{group_uin}"),
        sender: sender(uin),
        elements: vec![Element::text(text)],
    }
    .into()
}

pub fn friend_request(uin: u32) -> RawEvent {
    FriendRequest {
        source_uin: uin,
        source_uid: String::new(),
        source_nick: format!("user{uin}"),
        message: "hello".into(),
        source: "search".into(),
    }
    .into()
}

pub fn context(client: Arc<MockClient>, event: RawEvent) -> Arc<MessageContext> {
    Arc::new(MessageContext::new(client, event))
}
