//! Core building blocks of the state tree.
//!
//! This module contains the contract the tree is built from:
//! - Model definitions via the `Model` trait
//! - Messages and state paths
//! - Subscriptions and the matcher deciding which state claims a message
//!
//! Nothing in this module touches the tree itself.

mod message;
mod model;
mod subscription;

pub use message::{Message, StatePath, ANONYMOUS_SOURCE, BROADCAST_SOURCE, REPLY_SOURCE};
pub use model::{update_and_send, update_data, update_none, Model, Update};
pub use subscription::{Match, MessageFilter, Subscription, Subscriptions};

pub(crate) use model::{same_model, AnyModel, StateData};
