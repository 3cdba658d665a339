//! Builder API for configuring a storage up front.
//!
//! [`Storage::new`] gives an empty storage; the builder registers models,
//! observers and an initial snapshot in one go so misconfiguration surfaces
//! before the storage is used.

use crate::core::{AnyModel, Model};
use crate::events::{Observer, TracingObserver};
use crate::snapshot::Snapshot;
use crate::tree::{Storage, StorageError};
use std::rc::Rc;

/// Builder for constructing a [`Storage`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use statetree::builder::StorageBuilder;
/// use statetree::core::{update_none, Message, Model, Subscriptions, Update};
/// use statetree::snapshot::Snapshot;
/// use std::rc::Rc;
///
/// struct Flag;
///
/// impl Model for Flag {
///     type Data = bool;
///     type Init = bool;
///
///     fn id(&self) -> &str {
///         "flag"
///     }
///
///     fn init(&self, value: &bool) -> Update<bool> {
///         Update::new(*value)
///     }
///
///     fn update(&self, _data: &bool, _message: &Message) -> Option<Update<bool>> {
///         update_none()
///     }
///
///     fn subscribe(&self, _data: &bool) -> Subscriptions {
///         Subscriptions::new()
///     }
/// }
///
/// let flag = Rc::new(Flag);
/// let snapshot = Snapshot::from_json(r#"{"flag":{"id":"flag","data":true,"nested":{}}}"#).unwrap();
///
/// let storage = StorageBuilder::new()
///     .model(&flag)
///     .with_tracing()
///     .snapshot(snapshot)
///     .build()
///     .unwrap();
///
/// assert!(*storage.get_state(&flag, None).unwrap().data());
/// ```
#[derive(Default)]
pub struct StorageBuilder {
    models: Vec<Rc<dyn AnyModel>>,
    observers: Vec<Rc<dyn Observer>>,
    snapshot: Option<Snapshot>,
}

impl StorageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    pub fn model<M: Model>(mut self, model: &Rc<M>) -> Self {
        self.models.push(Rc::clone(model) as Rc<dyn AnyModel>);
        self
    }

    /// Add an observer for lifecycle events.
    pub fn observer(mut self, observer: Rc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Log every lifecycle event through `tracing`.
    pub fn with_tracing(self) -> Self {
        self.observer(Rc::new(TracingObserver))
    }

    /// Restore `snapshot` once models and observers are in place.
    pub fn snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Build the storage.
    /// Returns an error on conflicting models or an unrestorable snapshot.
    pub fn build(self) -> Result<Storage, StorageError> {
        let storage = Storage::new();

        for observer in self.observers {
            storage.add_observer(observer);
        }

        for model in self.models {
            storage.register_model(model)?;
        }

        if let Some(snapshot) = self.snapshot {
            storage.restore_snapshot(&snapshot)?;
        }

        Ok(storage)
    }
}
