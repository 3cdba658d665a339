//! The root container of a state tree.

use super::error::StorageError;
use super::ids::{ObserverId, SubscriberId};
use super::node::{Nested, Scope};
use super::routing::{
    create_inflight, find_closest_supervisor, handle_broadcast, process_instance_messages,
    process_storage_message,
};
use super::state::State;
use super::supervisor;
use crate::core::{
    same_model, AnyModel, Message, Model, Subscriptions, ANONYMOUS_SOURCE, BROADCAST_SOURCE,
    REPLY_SOURCE,
};
use crate::events::{Event, Observer};
use crate::snapshot::{self, Snapshot, SnapshotError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, debug_span};

pub(crate) type Listener = Rc<dyn Fn(&Message, &[String])>;

pub(crate) struct Subscriber {
    pub(crate) id: SubscriberId,
    pub(crate) listener: Listener,
    pub(crate) subscriptions: Subscriptions,
}

/// Shared state behind a [`Storage`] handle.
pub(crate) struct StorageInner {
    models: RefCell<HashMap<String, Rc<dyn AnyModel>>>,
    subscribers: RefCell<Vec<Rc<Subscriber>>>,
    observers: RefCell<Vec<(ObserverId, Rc<dyn Observer>)>>,
    pub(crate) nested: Nested,
}

impl StorageInner {
    pub(crate) fn new() -> Self {
        Self {
            models: RefCell::new(HashMap::new()),
            subscribers: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            nested: Nested::default(),
        }
    }

    /// Notify every observer, in registration order.
    pub(crate) fn emit(&self, event: &Event<'_>) {
        let observers: Vec<Rc<dyn Observer>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, o)| Rc::clone(o))
            .collect();

        for observer in observers {
            observer.on_event(event);
        }
    }

    pub(crate) fn model(&self, id: &str) -> Option<Rc<dyn AnyModel>> {
        self.models.borrow().get(id).cloned()
    }

    /// Register `model`, `Ok(true)` if it was new, `Ok(false)` if this exact
    /// model already was registered.
    pub(crate) fn try_add_model(&self, model: Rc<dyn AnyModel>) -> Result<bool, StorageError> {
        let mut models = self.models.borrow_mut();

        match models.get(model.model_id()) {
            Some(existing) if same_model(existing, &model) => Ok(false),
            Some(_) => Err(StorageError::ModelConflict {
                id: model.model_id().to_string(),
            }),
            None => {
                debug!(model = model.model_id(), "Model registered");
                models.insert(model.model_id().to_string(), model);
                Ok(true)
            }
        }
    }

    /// Fails if a different model is registered under the id of `model`.
    pub(crate) fn ensure_model(&self, model: &Rc<dyn AnyModel>) -> Result<(), StorageError> {
        match self.models.borrow().get(model.model_id()) {
            Some(existing) if !same_model(existing, model) => Err(StorageError::ModelConflict {
                id: model.model_id().to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn subscribers(&self) -> Vec<Rc<Subscriber>> {
        self.subscribers.borrow().clone()
    }

    pub(crate) fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.subscribers.borrow().iter().any(|s| s.id == id)
    }
}

/// Root of a state tree: owns the top-level states, the model registry and
/// the root-level subscribers.
///
/// `Storage` is a cheap handle; clones share the same tree, which lets
/// listeners and observers send further messages while a pass is running.
/// Such nested passes run to completion before the outer pass resumes.
///
/// # Example
///
/// ```rust
/// use statetree::core::{update_data, update_none, Message, Model, Subscriptions, Update};
/// use statetree::tree::Storage;
/// use std::rc::Rc;
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
/// let storage = Storage::new();
/// let counter = storage.create_state(&Rc::new(Counter), 0, None).unwrap();
///
/// counter.send_message(Message::new("inc"));
/// counter.send_message(Message::new("inc"));
///
/// assert_eq!(*counter.data(), 2);
/// ```
#[derive(Clone)]
pub struct Storage {
    inner: Rc<StorageInner>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// Create an empty storage without models, subscribers or observers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StorageInner::new()),
        }
    }

    pub(crate) fn from_inner(inner: Rc<StorageInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn scope(&self) -> Scope {
        Scope::Storage(Rc::clone(&self.inner))
    }

    /// Register a model so snapshots referencing it can be restored.
    ///
    /// Registering the same `Rc` again is a no-op, registering a different
    /// model under an id already in use fails.
    pub fn add_model<M: Model>(&self, model: &Rc<M>) -> Result<(), StorageError> {
        self.register_model(Rc::clone(model) as Rc<dyn AnyModel>)
    }

    pub(crate) fn register_model(&self, model: Rc<dyn AnyModel>) -> Result<(), StorageError> {
        self.inner.try_add_model(model).map(|_| ())
    }

    /// Registered model with the given id, if it is of type `M`.
    pub fn get_model<M: Model>(&self, id: &str) -> Option<Rc<M>> {
        self.inner.model(id)?.into_any().downcast::<M>().ok()
    }

    pub fn has_model(&self, id: &str) -> bool {
        self.inner.models.borrow().contains_key(id)
    }

    /// Top-level state for `model` named `name` (defaults to the model id).
    pub fn get_state<M: Model>(&self, model: &Rc<M>, name: Option<&str>) -> Option<State<M>> {
        supervisor::get_state(&self.scope(), model, name)
    }

    /// Create a top-level state, or return the existing one with that name.
    ///
    /// Fails with [`StorageError::NameTaken`] when the name belongs to a
    /// state of another model.
    pub fn create_state<M: Model>(
        &self,
        model: &Rc<M>,
        params: M::Init,
        name: Option<&str>,
    ) -> Result<State<M>, StorageError> {
        supervisor::create_state(&self.scope(), model, params, name)
    }

    /// Drop a top-level state together with its subtree.
    pub fn remove_state<M: Model>(&self, model: &Rc<M>, name: Option<&str>) {
        supervisor::remove_state(&self.scope(), model, name)
    }

    /// Names of the top-level states, in creation order.
    pub fn state_names(&self) -> Vec<String> {
        self.inner
            .nested
            .nodes()
            .iter()
            .map(|n| n.name.clone())
            .collect()
    }

    /// Send a message from the root; only root subscribers can receive it.
    pub fn send_message(&self, message: Message) {
        self.send_message_from(message, ANONYMOUS_SOURCE)
    }

    pub fn send_message_from(&self, message: Message, source: &str) {
        supervisor::send_message(&self.scope(), message, source)
    }

    /// Deliver a message to every state, depth-first with children before
    /// their supervisor, then to the root subscribers.
    pub fn broadcast_message(&self, message: Message) {
        self.broadcast_message_from(message, BROADCAST_SOURCE)
    }

    pub fn broadcast_message_from(&self, message: Message, source: &str) {
        let _span = debug_span!("broadcast", tag = message.tag()).entered();

        let inflight = create_inflight(&self.inner, vec![source.to_string()], message);
        let returning = handle_broadcast(&self.inner, &[], self.inner.nested.nodes(), &inflight);

        for message in &returning {
            process_storage_message(&self.inner, message);
        }
    }

    /// Route a message upward from the deepest existing state along `target`.
    ///
    /// Missing trailing names are ignored, a fully missing path replies to
    /// the root subscribers only.
    pub fn reply_message(&self, message: Message, target: &[String]) {
        self.reply_message_from(message, target, REPLY_SOURCE)
    }

    pub fn reply_message_from(&self, message: Message, target: &[String], source: &str) {
        let _span = debug_span!("reply", tag = message.tag()).entered();

        let anchor = find_closest_supervisor(self.scope(), target);
        let mut source_path = target.to_vec();
        source_path.push(source.to_string());

        let inflight = vec![create_inflight(&self.inner, source_path, message)];
        process_instance_messages(&self.inner, anchor, inflight);
    }

    /// Listen to messages reaching the root which match `subscriptions`.
    ///
    /// An active match claims the message, unclaimed messages are reported
    /// as `unhandledMessage`.
    pub fn add_subscriber<F>(&self, subscriptions: Subscriptions, listener: F) -> SubscriberId
    where
        F: Fn(&Message, &[String]) + 'static,
    {
        let id = SubscriberId::generate();

        self.inner.subscribers.borrow_mut().push(Rc::new(Subscriber {
            id,
            listener: Rc::new(listener),
            subscriptions,
        }));

        id
    }

    /// Returns `false` if no such subscriber was registered.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();

        match subscribers.iter().position(|s| s.id == id) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn add_observer(&self, observer: Rc<dyn Observer>) -> ObserverId {
        let id = ObserverId::generate();
        self.inner.observers.borrow_mut().push((id, observer));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(o, _)| *o != id);
        observers.len() != before
    }

    /// Capture names, model ids and data of the whole tree.
    pub fn get_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        snapshot::capture(&self.inner, &self.inner.nested, &[])
    }

    /// Replace the whole tree with the content of `snapshot`.
    ///
    /// Every model referenced by the snapshot must be registered. Nothing is
    /// changed when restoring fails.
    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let _span = debug_span!("restore_snapshot", states = snapshot.len()).entered();

        self.inner.emit(&Event::SnapshotRestore { snapshot });
        snapshot::restore(&self.inner, &self.scope(), snapshot)?;
        self.inner.emit(&Event::SnapshotRestored);

        Ok(())
    }
}
