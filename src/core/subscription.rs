//! Subscriptions and the message matcher.
//!
//! A state (or a root-level subscriber) declares which message tags it is
//! interested in through a [`Subscriptions`] set. The matcher decides, per
//! message, whether the set claims it.

use super::message::Message;
use std::fmt;
use std::rc::Rc;

/// Pure predicate adding custom filtering on top of tag matching.
///
/// # Example
///
/// ```rust
/// use statetree::core::{Message, MessageFilter};
/// use serde_json::json;
///
/// let only_large = MessageFilter::new(|m: &Message| {
///     m.payload()["amount"].as_i64().unwrap_or(0) > 10
/// });
///
/// assert!(only_large.check(&Message::new("add").with_payload(json!({ "amount": 11 }))));
/// assert!(!only_large.check(&Message::new("add")));
/// ```
#[derive(Clone)]
pub struct MessageFilter {
    predicate: Rc<dyn Fn(&Message) -> bool>,
}

impl MessageFilter {
    /// Create a filter from a predicate.
    ///
    /// The predicate must be deterministic and free of side effects, it may
    /// run several times for the same message.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + 'static,
    {
        Self {
            predicate: Rc::new(predicate),
        }
    }

    pub fn check(&self, message: &Message) -> bool {
        (self.predicate)(message)
    }
}

impl fmt::Debug for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageFilter(..)")
    }
}

/// Options for a single subscribed tag.
///
/// `Subscription::default()` is an active subscription without a filter.
#[derive(Clone, Debug, Default)]
pub struct Subscription {
    /// Passive subscriptions observe a message without claiming it, they are
    /// invoked even when the message already has been received.
    pub passive: bool,
    /// Extra, user-supplied filtering logic.
    pub matching: Option<MessageFilter>,
}

impl Subscription {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn passive() -> Self {
        Self {
            passive: true,
            matching: None,
        }
    }

    /// Restrict the subscription with a predicate.
    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + 'static,
    {
        self.matching = Some(MessageFilter::new(predicate));
        self
    }
}

/// Result of a successful match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub passive: bool,
}

/// Insertion-ordered mapping from message tag to [`Subscription`].
///
/// # Example
///
/// ```rust
/// use statetree::core::{Message, Subscriptions};
///
/// let subs = Subscriptions::new().on("inc").passive("log");
///
/// let m = subs.find_match(&Message::new("inc"), false).unwrap();
/// assert!(!m.passive);
///
/// // Already claimed: only passive subscriptions still match
/// assert!(subs.find_match(&Message::new("inc"), true).is_none());
/// assert!(subs.find_match(&Message::new("log"), true).is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Subscriptions {
    entries: Vec<(String, Subscription)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `tag` with default options (active, no filter).
    pub fn on(self, tag: impl Into<String>) -> Self {
        self.with(tag, Subscription::active())
    }

    /// Subscribe passively to `tag`.
    pub fn passive(self, tag: impl Into<String>) -> Self {
        self.with(tag, Subscription::passive())
    }

    /// Subscribe actively to `tag`, only for messages accepted by `predicate`.
    pub fn matching<F>(self, tag: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + 'static,
    {
        self.with(tag, Subscription::active().matching(predicate))
    }

    /// Insert or replace the subscription for `tag`.
    ///
    /// Replacing keeps the original position of the tag.
    pub fn with(mut self, tag: impl Into<String>, subscription: Subscription) -> Self {
        let tag = tag.into();
        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = subscription,
            None => self.entries.push((tag, subscription)),
        }
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Subscription> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, subscription)| subscription)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subscription)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s))
    }

    /// Decide whether this set claims `message`.
    ///
    /// `received` tells whether an active subscription already claimed the
    /// message during the current pass. A subscription for the message's tag
    /// matches when it is passive or the message is unclaimed, and its filter,
    /// if any, accepts the message.
    pub fn find_match(&self, message: &Message, received: bool) -> Option<Match> {
        let subscription = self.get(message.tag())?;

        if !subscription.passive && received {
            return None;
        }

        if let Some(filter) = &subscription.matching {
            if !filter.check(message) {
                return None;
            }
        }

        Some(Match {
            passive: subscription.passive,
        })
    }
}
