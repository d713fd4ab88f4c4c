//! Message formatting for logs.
//!
//! Produces a compact JSON description of a message together with a one-line
//! human readable summary, e.g.
//!
//! ```text
//! {"type":"group","sender":"alice","sender_id":42,"group_id":500,
//!  "elements":[{"type":"text","content":"hi "},{"type":"at","target":7}],
//!  "summary":"hi  @7"}
//! ```
//!
//! Faces are left out of the element list and the summary.

use serde::Serialize;

use crate::foundation::{Element, GroupMessage, PrivateMessage};

/// Summary used when a message has no describable element.
pub const EMPTY_SUMMARY: &str = "多媒体消息";

/// One element of a formatted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementInfo {
    /// Element type (`text`, `image`, `at`, `reply`).
    #[serde(rename = "type")]
    pub element_type: &'static str,
    /// Text content, text elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Image URL, image elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Mentioned uin, mention elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    /// Replied sequence, reply elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<u32>,
}

impl ElementInfo {
    fn new(element_type: &'static str) -> Self {
        Self {
            element_type,
            content: None,
            url: None,
            target: None,
            reply_id: None,
        }
    }

    /// Describes `element`, or returns `None` for element types that are not
    /// reported.
    pub fn from_element(element: &Element) -> Option<Self> {
        let info = match element {
            Element::Text { content } => Self {
                content: Some(content.clone()),
                ..Self::new("text")
            },
            Element::Image { url } => Self {
                url: (!url.is_empty()).then(|| url.clone()),
                ..Self::new("image")
            },
            Element::At { target, .. } => Self {
                target: Some(*target),
                ..Self::new("at")
            },
            Element::Reply { seq } => Self {
                reply_id: Some(*seq),
                ..Self::new("reply")
            },
            Element::Face { .. } => return None,
        };
        Some(info)
    }
}

/// A formatted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageInfo {
    /// `private` or `group`.
    #[serde(rename = "type")]
    pub message_type: &'static str,
    /// Sender nickname.
    pub sender: String,
    /// Sender uin.
    pub sender_id: u32,
    /// Group uin, group messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u32>,
    /// Reported elements.
    pub elements: Vec<ElementInfo>,
    /// One-line summary.
    pub summary: String,
}

impl MessageInfo {
    /// Describes a private message.
    pub fn from_private(msg: &PrivateMessage) -> Self {
        Self {
            message_type: "private",
            sender: msg.sender.nickname.clone(),
            sender_id: msg.sender.uin,
            group_id: None,
            elements: element_infos(&msg.elements),
            summary: summarize(&msg.elements),
        }
    }

    /// Describes a group message.
    pub fn from_group(msg: &GroupMessage) -> Self {
        Self {
            message_type: "group",
            sender: msg.sender.nickname.clone(),
            sender_id: msg.sender.uin,
            group_id: Some(msg.group_uin),
            elements: element_infos(&msg.elements),
            summary: summarize(&msg.elements),
        }
    }

    /// Serializes this description to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn element_infos(elements: &[Element]) -> Vec<ElementInfo> {
    elements.iter().filter_map(ElementInfo::from_element).collect()
}

/// Builds a one-line summary of `elements`.
///
/// Text is kept verbatim, images become `[图片]`, mentions `@uin` and replies
/// `[回复消息ID:seq]`; parts are joined with a single space. Falls back to
/// [`EMPTY_SUMMARY`] when the joined summary is empty.
pub fn summarize(elements: &[Element]) -> String {
    let summary = elements
        .iter()
        .filter(|element| !matches!(element, Element::Face { .. }))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    if summary.is_empty() {
        EMPTY_SUMMARY.to_string()
    } else {
        summary
    }
}

/// Formats a private message as JSON.
pub fn format_private_json(msg: &PrivateMessage) -> serde_json::Result<String> {
    MessageInfo::from_private(msg).to_json()
}

/// Formats a group message as JSON.
pub fn format_group_json(msg: &GroupMessage) -> serde_json::Result<String> {
    MessageInfo::from_group(msg).to_json()
}
