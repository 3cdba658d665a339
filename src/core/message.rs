//! Messages routed through the state tree.
//!
//! A message is identified by its `tag`, the only key used when matching
//! subscriptions. Anything else the application wants to carry travels in the
//! opaque JSON `payload`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of names from the root container down to a state, exclusive of the
/// root itself.
///
/// For in-flight messages the path doubles as provenance: the path of the
/// closest state followed by a source label.
pub type StatePath = Vec<String>;

/// Source label used by `send_message` when no label is given.
pub const ANONYMOUS_SOURCE: &str = "$";

/// Source label used by `broadcast_message` when no label is given.
pub const BROADCAST_SOURCE: &str = "@";

/// Source label used by `reply_message` when no label is given.
pub const REPLY_SOURCE: &str = "<";

/// Tagged application message.
///
/// # Example
///
/// ```rust
/// use statetree::core::Message;
/// use serde_json::json;
///
/// let msg = Message::new("add").with_payload(json!({ "amount": 5 }));
///
/// assert_eq!(msg.tag(), "add");
/// assert_eq!(msg.payload()["amount"], 5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    tag: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
}

impl Message {
    /// Create a message carrying only a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            payload: Value::Null,
        }
    }

    /// Attach a payload, replacing any previous one.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Decode the payload into a typed value, `None` if it does not fit `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(&self.payload).ok()
    }
}
