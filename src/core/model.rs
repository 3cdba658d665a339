//! The Model contract every state instance is built from.
//!
//! A model is an immutable definition: an id used as registry key, an
//! initializer, an updater reacting to messages and a subscription policy.
//! All methods are expected to be pure and must not panic; a panicking model
//! aborts the current routing pass midway and leaves the tree partially
//! updated.

use super::message::Message;
use super::subscription::Subscriptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::rc::Rc;

/// New data for a state together with messages to send to its supervisors.
#[derive(Clone, Debug, PartialEq)]
pub struct Update<T> {
    pub data: T,
    pub messages: Vec<Message>,
}

impl<T> Update<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            messages: Vec::new(),
        }
    }

    pub fn with_messages(data: T, messages: Vec<Message>) -> Self {
        Self { data, messages }
    }
}

/// The message was consumed without changing data or sending anything.
pub fn update_none<T>() -> Option<Update<T>> {
    None
}

/// Replace the data of the state.
pub fn update_data<T>(data: T) -> Option<Update<T>> {
    Some(Update::new(data))
}

/// Replace the data of the state and send messages to its supervisors.
pub fn update_and_send<T>(data: T, messages: Vec<Message>) -> Option<Update<T>> {
    Some(Update::with_messages(data, messages))
}

/// Definition of a state holding `Data`, instantiated from `Init`.
///
/// Models are registered by `Rc`: re-registering the same `Rc` is a no-op,
/// registering a different model under an already used id is an error.
///
/// # Example
///
/// ```rust
/// use statetree::core::{update_data, update_none, Message, Model, Subscriptions, Update};
///
/// struct Counter;
///
/// impl Model for Counter {
///     type Data = i64;
///     type Init = i64;
///
///     fn id(&self) -> &str {
///         "counter"
///     }
///
///     fn init(&self, start: &i64) -> Update<i64> {
///         Update::new(*start)
///     }
///
///     fn update(&self, data: &i64, message: &Message) -> Option<Update<i64>> {
///         match message.tag() {
///             "inc" => update_data(data + 1),
///             _ => update_none(),
///         }
///     }
///
///     fn subscribe(&self, _data: &i64) -> Subscriptions {
///         Subscriptions::new().on("inc")
///     }
/// }
///
/// assert_eq!(Counter.init(&4).data, 4);
/// assert_eq!(Counter.update(&4, &Message::new("inc")), update_data(5));
/// ```
pub trait Model: 'static {
    /// Data held by a state. Serializable so it can be captured in snapshots.
    type Data: Serialize + DeserializeOwned + 'static;

    /// Parameters used to create a new state.
    type Init: 'static;

    /// Registry key, unique per storage.
    fn id(&self) -> &str;

    /// Build the initial data, messages are routed as if sent by the new
    /// state right after its creation.
    fn init(&self, params: &Self::Init) -> Update<Self::Data>;

    /// React to a matched message. `None` leaves data untouched.
    fn update(&self, data: &Self::Data, message: &Message) -> Option<Update<Self::Data>>;

    /// Current subscriptions, re-evaluated whenever the data changes.
    fn subscribe(&self, data: &Self::Data) -> Subscriptions;
}

/// Type-erased data held by a node.
pub(crate) type StateData = Rc<dyn Any>;

/// Object-safe view of a [`Model`], used by the registry and the router.
pub(crate) trait AnyModel {
    fn model_id(&self) -> &str;

    fn update_any(&self, data: &dyn Any, message: &Message) -> Option<Update<StateData>>;

    fn subscribe_any(&self, data: &dyn Any) -> Subscriptions;

    fn encode_data(&self, data: &dyn Any) -> Result<Value, String>;

    fn decode_data(&self, value: &Value) -> Result<StateData, String>;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<M: Model> AnyModel for M {
    fn model_id(&self) -> &str {
        self.id()
    }

    fn update_any(&self, data: &dyn Any, message: &Message) -> Option<Update<StateData>> {
        let Some(data) = data.downcast_ref::<M::Data>() else {
            tracing::error!(model = self.id(), "state data does not belong to its model");
            return None;
        };

        self.update(data, message).map(|u| Update {
            data: Rc::new(u.data) as StateData,
            messages: u.messages,
        })
    }

    fn subscribe_any(&self, data: &dyn Any) -> Subscriptions {
        match data.downcast_ref::<M::Data>() {
            Some(data) => self.subscribe(data),
            None => {
                tracing::error!(model = self.id(), "state data does not belong to its model");
                Subscriptions::new()
            }
        }
    }

    fn encode_data(&self, data: &dyn Any) -> Result<Value, String> {
        let data = data
            .downcast_ref::<M::Data>()
            .ok_or_else(|| "state data does not belong to its model".to_string())?;

        serde_json::to_value(data).map_err(|e| e.to_string())
    }

    fn decode_data(&self, value: &Value) -> Result<StateData, String> {
        let data = <M::Data as Deserialize>::deserialize(value).map_err(|e| e.to_string())?;

        Ok(Rc::new(data))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Whether two registry entries are the same model allocation.
pub(crate) fn same_model(a: &Rc<dyn AnyModel>, b: &Rc<dyn AnyModel>) -> bool {
    std::ptr::eq(
        Rc::as_ptr(a) as *const (),
        Rc::as_ptr(b) as *const (),
    )
}
