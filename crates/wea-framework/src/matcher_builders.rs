//! Built-in matchers.
//!
//! ```rust,ignore
//! Route::new("hello", handler)
//!     .matcher(group_message())
//!     .matcher(text_equals("hello", false))
//!     .matcher(not(from_user(10001)));
//! ```

use wea_core::{EventKind, MessageContext};

use crate::command::CommandSpec;
use crate::matcher::{BoxedMatcher, Matcher};

// ============================================================================
// Constant and event kind
// ============================================================================

/// Matches everything or nothing.
#[derive(Debug, Clone, Copy)]
pub struct Constant(bool);

impl Matcher for Constant {
    fn matches(&self, _ctx: &MessageContext) -> bool {
        self.0
    }
}

/// Matches every event.
pub fn always() -> Constant {
    Constant(true)
}

/// Matches no event.
pub fn never() -> Constant {
    Constant(false)
}

/// Matches events of a set of kinds.
#[derive(Debug, Clone)]
pub struct KindMatcher {
    kinds: Vec<EventKind>,
}

impl KindMatcher {
    /// Matches any of `kinds`.
    pub fn new(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }
}

impl Matcher for KindMatcher {
    fn matches(&self, ctx: &MessageContext) -> bool {
        self.kinds.contains(&ctx.kind())
    }
}

/// Matches private messages.
pub fn private_message() -> KindMatcher {
    KindMatcher::new([EventKind::PrivateMessage])
}

/// Matches group messages.
pub fn group_message() -> KindMatcher {
    KindMatcher::new([EventKind::GroupMessage])
}

/// Matches private and group messages.
pub fn any_message() -> KindMatcher {
    KindMatcher::new([EventKind::PrivateMessage, EventKind::GroupMessage])
}

/// Matches friend requests.
pub fn friend_request() -> KindMatcher {
    KindMatcher::new([EventKind::FriendRequest])
}

// ============================================================================
// Text
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Equals,
    Prefix,
    Contains,
}

/// Matches on the plain text of a message.
///
/// Events without text never match a non-empty pattern.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    mode: TextMode,
    pattern: String,
    case_sensitive: bool,
}

impl TextMatcher {
    fn new(mode: TextMode, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        let pattern = pattern.into();
        Self {
            mode,
            pattern: if case_sensitive {
                pattern
            } else {
                pattern.to_lowercase()
            },
            case_sensitive,
        }
    }
}

impl Matcher for TextMatcher {
    fn matches(&self, ctx: &MessageContext) -> bool {
        let mut text = ctx.message_text();
        if !self.case_sensitive {
            text = text.to_lowercase();
        }
        match self.mode {
            TextMode::Equals => text == self.pattern,
            TextMode::Prefix => text.starts_with(&self.pattern),
            TextMode::Contains => text.contains(&self.pattern),
        }
    }
}

/// Matches messages whose text equals `text`.
pub fn text_equals(text: impl Into<String>, case_sensitive: bool) -> TextMatcher {
    TextMatcher::new(TextMode::Equals, text, case_sensitive)
}

/// Matches messages whose text starts with `prefix` (case-sensitive).
pub fn text_prefix(prefix: impl Into<String>) -> TextMatcher {
    TextMatcher::new(TextMode::Prefix, prefix, true)
}

/// Matches messages whose text contains `needle` (case-sensitive).
pub fn text_contains(needle: impl Into<String>) -> TextMatcher {
    TextMatcher::new(TextMode::Contains, needle, true)
}

/// Matches invocations of a prefix command.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    spec: CommandSpec,
}

impl CommandMatcher {
    /// Matches `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Matcher for CommandMatcher {
    fn matches(&self, ctx: &MessageContext) -> bool {
        ctx.kind().is_message() && self.spec.parse(&ctx.message_text()).is_some()
    }
}

/// Matches messages invoking `prefix` + `name`, e.g. `command("/", "echo")`.
pub fn command(prefix: impl Into<String>, name: impl Into<String>) -> CommandMatcher {
    CommandMatcher::new(CommandSpec::new(prefix, name))
}

// ============================================================================
// Origin
// ============================================================================

/// Matches events caused by one user.
#[derive(Debug, Clone, Copy)]
pub struct UserMatcher(u32);

impl Matcher for UserMatcher {
    fn matches(&self, ctx: &MessageContext) -> bool {
        ctx.sender_uin() == self.0
    }
}

/// Matches events caused by `uin`.
pub fn from_user(uin: u32) -> UserMatcher {
    UserMatcher(uin)
}

/// Matches group messages from one group.
#[derive(Debug, Clone, Copy)]
pub struct GroupMatcher(u32);

impl Matcher for GroupMatcher {
    fn matches(&self, ctx: &MessageContext) -> bool {
        ctx.group_message()
            .is_some_and(|msg| msg.group_uin == self.0)
    }
}

/// Matches group messages posted in `group_uin`.
pub fn in_group(group_uin: u32) -> GroupMatcher {
    GroupMatcher(group_uin)
}

// ============================================================================
// Combinators
// ============================================================================

/// Inverts a matcher.
#[derive(Debug, Clone)]
pub struct Not<M>(M);

impl<M: Matcher> Matcher for Not<M> {
    fn matches(&self, ctx: &MessageContext) -> bool {
        !self.0.matches(ctx)
    }
}

/// Matches when `matcher` does not.
pub fn not<M: Matcher>(matcher: M) -> Not<M> {
    Not(matcher)
}

/// Matches when any inner matcher does. Empty never matches.
pub struct AnyOf(Vec<BoxedMatcher>);

impl Matcher for AnyOf {
    fn matches(&self, ctx: &MessageContext) -> bool {
        self.0.iter().any(|matcher| matcher.matches(ctx))
    }
}

/// Matches when at least one of `matchers` does.
pub fn any_of(matchers: impl IntoIterator<Item = BoxedMatcher>) -> AnyOf {
    AnyOf(matchers.into_iter().collect())
}

/// Matches when every inner matcher does. Empty always matches.
pub struct AllOf(Vec<BoxedMatcher>);

impl Matcher for AllOf {
    fn matches(&self, ctx: &MessageContext) -> bool {
        crate::matcher::all_match(&self.0, ctx)
    }
}

/// Matches when all of `matchers` do.
pub fn all_of(matchers: impl IntoIterator<Item = BoxedMatcher>) -> AllOf {
    AllOf(matchers.into_iter().collect())
}
