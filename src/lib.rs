//! Statetree: a hierarchical, message-driven state container
//!
//! Application state is organised as a tree of named states. Every state is
//! an instance of a [`Model`]: a pure description of how its data is
//! initialised, which messages it listens to and how it reacts to them.
//! Messages travel upward from their sender towards the root, or are
//! broadcast to every state; whatever nobody claims ends up reported as
//! unhandled.
//!
//! # Core Concepts
//!
//! - **Model**: Pure `init` / `update` / `subscribe` functions over immutable data
//! - **State**: A named instance of a model, nested under a supervisor
//! - **Storage**: The root of the tree, holding models, subscribers and observers
//! - **Snapshot**: The whole tree as an ordered JSON document
//!
//! # Example
//!
//! ```rust
//! use statetree::{update_data, update_none, Message, Model, Storage, Subscriptions, Update};
//! use std::rc::Rc;
//!
//! struct Counter;
//!
//! impl Model for Counter {
//!     type Data = i64;
//!     type Init = i64;
//!
//!     fn id(&self) -> &str {
//!         "counter"
//!     }
//!
//!     fn init(&self, start: &i64) -> Update<i64> {
//!         Update::new(*start)
//!     }
//!
//!     fn update(&self, data: &i64, message: &Message) -> Option<Update<i64>> {
//!         match message.tag() {
//!             "inc" => update_data(data + 1),
//!             _ => update_none(),
//!         }
//!     }
//!
//!     fn subscribe(&self, _data: &i64) -> Subscriptions {
//!         Subscriptions::new().on("inc")
//!     }
//! }
//!
//! let counter = Rc::new(Counter);
//! let storage = Storage::new();
//! let state = storage.create_state(&counter, 0, None).unwrap();
//!
//! state.send_message(Message::new("inc"));
//!
//! let snapshot = storage.get_snapshot().unwrap();
//! assert_eq!(
//!     snapshot.to_json().unwrap(),
//!     r#"{"counter":{"id":"counter","data":1,"nested":{}}}"#
//! );
//! ```

pub mod builder;
pub mod core;
pub mod events;
pub mod snapshot;
pub mod tree;

// Re-export commonly used types
pub use builder::StorageBuilder;
pub use core::{
    update_and_send, update_data, update_none, Message, Model, StatePath, Subscription,
    Subscriptions, Update,
};
pub use events::{Event, Observer, TracingObserver};
pub use snapshot::{Snapshot, SnapshotError, StateSnapshot};
pub use tree::{ListenerId, ObserverId, State, Storage, StorageError, SubscriberId};
