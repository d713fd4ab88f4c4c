//! Raw events delivered by the transport.
//!
//! # Hierarchy
//!
//! ```text
//! RawEvent
//! ├── PrivateMessage { id, time, sender, self_uin, elements }
//! ├── GroupMessage   { id, time, group_uin, group_name, sender, elements }
//! └── FriendRequest  { source_uin, source_uid, source_nick, message, source }
//! ```
//!
//! [`RawEvent`] is a closed sum type: the dispatch engine narrows it through
//! the `as_*` accessors and never inspects anything else about the transport.
//! It is `#[non_exhaustive]` so that new event kinds can be added without
//! breaking downstream matches.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::Element;

// ============================================================================
// Shared Types
// ============================================================================

/// Message sender information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Sender's uin.
    pub uin: u32,
    /// Sender's protocol-level uid.
    #[serde(default)]
    pub uid: String,
    /// Nickname.
    #[serde(default)]
    pub nickname: String,
    /// Group card (group nickname), group messages only.
    #[serde(default)]
    pub card: Option<String>,
}

impl Sender {
    /// Returns the group card if set, otherwise the nickname.
    pub fn display_name(&self) -> &str {
        match self.card.as_deref() {
            Some(card) if !card.is_empty() => card,
            _ => &self.nickname,
        }
    }
}

// ============================================================================
// Event Variants
// ============================================================================

/// A one-to-one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Message id.
    pub id: u32,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub time: u64,
    /// Who sent the message.
    pub sender: Sender,
    /// The receiving account.
    #[serde(default)]
    pub self_uin: u32,
    /// Message content.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A message posted in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Message id.
    pub id: u32,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub time: u64,
    /// Group uin.
    pub group_uin: u32,
    /// Group name.
    #[serde(default)]
    pub group_name: String,
    /// Who sent the message.
    pub sender: Sender,
    /// Message content.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A request to become friends with the bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// Requester's uin.
    pub source_uin: u32,
    /// Requester's uid.
    #[serde(default)]
    pub source_uid: String,
    /// Requester's nickname.
    #[serde(default)]
    pub source_nick: String,
    /// Verification message.
    #[serde(default)]
    pub message: String,
    /// Where the request came from (search, group, ...).
    #[serde(default)]
    pub source: String,
}

// ============================================================================
// RawEvent
// ============================================================================

/// The kind of a [`RawEvent`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventKind {
    /// See [`PrivateMessage`].
    PrivateMessage,
    /// See [`GroupMessage`].
    GroupMessage,
    /// See [`FriendRequest`].
    FriendRequest,
}

impl EventKind {
    /// Returns the kind as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivateMessage => "private_message",
            Self::GroupMessage => "group_message",
            Self::FriendRequest => "friend_request",
        }
    }

    /// Returns true for kinds that carry message content.
    pub fn is_message(&self) -> bool {
        matches!(self, Self::PrivateMessage | Self::GroupMessage)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum RawEvent {
    /// A private message.
    PrivateMessage(PrivateMessage),
    /// A group message.
    GroupMessage(GroupMessage),
    /// A friend request.
    FriendRequest(FriendRequest),
}

impl RawEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PrivateMessage(_) => EventKind::PrivateMessage,
            Self::GroupMessage(_) => EventKind::GroupMessage,
            Self::FriendRequest(_) => EventKind::FriendRequest,
        }
    }

    /// Narrows to a private message.
    pub fn as_private_message(&self) -> Option<&PrivateMessage> {
        match self {
            Self::PrivateMessage(msg) => Some(msg),
            _ => None,
        }
    }

    /// Narrows to a group message.
    pub fn as_group_message(&self) -> Option<&GroupMessage> {
        match self {
            Self::GroupMessage(msg) => Some(msg),
            _ => None,
        }
    }

    /// Narrows to a friend request.
    pub fn as_friend_request(&self) -> Option<&FriendRequest> {
        match self {
            Self::FriendRequest(req) => Some(req),
            _ => None,
        }
    }

    /// Returns the message content, for message events.
    pub fn elements(&self) -> Option<&[Element]> {
        match self {
            Self::PrivateMessage(msg) => Some(&msg.elements),
            Self::GroupMessage(msg) => Some(&msg.elements),
            Self::FriendRequest(_) => None,
        }
    }

    /// Returns the uin of the user that caused this event.
    pub fn sender_uin(&self) -> u32 {
        match self {
            Self::PrivateMessage(msg) => msg.sender.uin,
            Self::GroupMessage(msg) => msg.sender.uin,
            Self::FriendRequest(req) => req.source_uin,
        }
    }
}

impl From<PrivateMessage> for RawEvent {
    fn from(msg: PrivateMessage) -> Self {
        Self::PrivateMessage(msg)
    }
}

impl From<GroupMessage> for RawEvent {
    fn from(msg: GroupMessage) -> Self {
        Self::GroupMessage(msg)
    }
}

impl From<FriendRequest> for RawEvent {
    fn from(req: FriendRequest) -> Self {
        Self::FriendRequest(req)
    }
}
