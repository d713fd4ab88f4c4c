//! Route predicates.
//!
//! A [`Matcher`] decides whether a route applies to an event. A route's
//! matchers are evaluated in registration order and ANDed with
//! short-circuit: the first `false` stops evaluation and the route is
//! skipped without running any middleware.
//!
//! Matchers only read the context. Closures of type
//! `Fn(&MessageContext) -> bool` are matchers, and
//! [`matcher_builders`](crate::matcher_builders) provides the common ones.

use std::sync::Arc;

use wea_core::MessageContext;

/// A predicate over a [`MessageContext`].
pub trait Matcher: Send + Sync + 'static {
    /// Returns true if the route should run for `ctx`.
    fn matches(&self, ctx: &MessageContext) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&MessageContext) -> bool + Send + Sync + 'static,
{
    fn matches(&self, ctx: &MessageContext) -> bool {
        self(ctx)
    }
}

/// A shared, type-erased matcher.
pub type BoxedMatcher = Arc<dyn Matcher>;

/// Erases a matcher.
pub fn boxed<M: Matcher>(matcher: M) -> BoxedMatcher {
    Arc::new(matcher)
}

/// Returns true if every matcher accepts `ctx`.
///
/// Stops at the first rejection; an empty list accepts everything.
pub fn all_match(matchers: &[BoxedMatcher], ctx: &MessageContext) -> bool {
    matchers.iter().all(|matcher| matcher.matches(ctx))
}
