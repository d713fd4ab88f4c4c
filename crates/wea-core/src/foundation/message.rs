//! Message elements.
//!
//! A chat message is an ordered list of [`Element`]s: plain text interleaved
//! with images, mentions, replies and faces. Only text elements contribute to
//! the message's plain text (see [`extract_text`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use wea_core::{Element, extract_text};
//!
//! let content = vec![Element::text("a"), Element::image("http://x/1.png"), Element::text("b")];
//! assert_eq!(extract_text(&content), "ab");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single element of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Plain text.
    Text {
        /// The text content.
        content: String,
    },
    /// An image, addressed by URL.
    Image {
        /// Download URL (may be empty for images that were not uploaded yet).
        #[serde(default)]
        url: String,
    },
    /// A mention of another user.
    At {
        /// Mentioned user's uin.
        target: u32,
        /// Display text shown in the client, e.g. `@nickname`.
        #[serde(default)]
        display: String,
    },
    /// A reply to an earlier message.
    Reply {
        /// Sequence number of the replied message.
        seq: u32,
    },
    /// A built-in emoji face.
    Face {
        /// Face identifier.
        id: u16,
    },
}

impl Element {
    /// Creates a text element.
    pub fn text(content: impl Into<String>) -> Self {
        Element::Text {
            content: content.into(),
        }
    }

    /// Creates an image element.
    pub fn image(url: impl Into<String>) -> Self {
        Element::Image { url: url.into() }
    }

    /// Creates a mention element.
    pub fn at(target: u32) -> Self {
        Element::At {
            target,
            display: String::new(),
        }
    }

    /// Creates a reply element.
    pub fn reply(seq: u32) -> Self {
        Element::Reply { seq }
    }

    /// Creates a face element.
    pub fn face(id: u16) -> Self {
        Element::Face { id }
    }

    /// Returns the type identifier of this element.
    pub fn element_type(&self) -> &'static str {
        match self {
            Element::Text { .. } => "text",
            Element::Image { .. } => "image",
            Element::At { .. } => "at",
            Element::Reply { .. } => "reply",
            Element::Face { .. } => "face",
        }
    }

    /// Returns the text content if this is a text element.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text { content } => Some(content),
            _ => None,
        }
    }

    /// Returns true if this is a text element.
    pub fn is_text(&self) -> bool {
        matches!(self, Element::Text { .. })
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Text { content } => write!(f, "{content}"),
            Element::Image { .. } => write!(f, "[图片]"),
            Element::At { target, .. } => write!(f, "@{target}"),
            Element::Reply { seq } => write!(f, "[回复消息ID:{seq}]"),
            Element::Face { id } => write!(f, "[表情:{id}]"),
        }
    }
}

/// Concatenates the text elements of `elements` in their original order.
///
/// Every non-text element is skipped silently. Returns an empty string if the
/// list holds no text element.
pub fn extract_text(elements: &[Element]) -> String {
    elements.iter().filter_map(Element::as_text).collect()
}
