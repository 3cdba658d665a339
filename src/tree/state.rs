//! Typed handle to a state instance.

use super::error::StorageError;
use super::ids::ListenerId;
use super::node::{NodeInner, Scope};
use super::storage::Storage;
use super::supervisor;
use crate::core::{Message, Model, StatePath, ANONYMOUS_SOURCE};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A live instance of the model `M` inside a state tree.
///
/// Handles are cheap to clone and compare by identity. A handle keeps its
/// state alive, but once the state is removed from the tree it no longer
/// receives messages.
pub struct State<M: Model> {
    node: Rc<NodeInner>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> State<M> {
    pub(crate) fn from_node(node: Rc<NodeInner>) -> Self {
        Self {
            node,
            _model: PhantomData,
        }
    }

    pub(crate) fn node(&self) -> &Rc<NodeInner> {
        &self.node
    }

    fn scope(&self) -> Scope {
        Scope::State(Rc::clone(&self.node))
    }

    /// Id of the model this state was created from.
    pub fn id(&self) -> &str {
        &self.node.id
    }

    /// Name of the state in its supervisor.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn path(&self) -> StatePath {
        self.node.path()
    }

    /// Current data.
    ///
    /// Data is replaced on every update, a returned value never changes.
    pub fn data(&self) -> Rc<M::Data> {
        match self.node.data().downcast::<M::Data>() {
            Ok(data) => data,
            // Handles are only built for nodes of the registered model `M`
            Err(_) => unreachable!("state '{}' holds data of a foreign model", self.node.name),
        }
    }

    /// Storage this state belongs to, `None` once the storage is dropped.
    pub fn storage(&self) -> Option<Storage> {
        self.node.storage().map(Storage::from_inner)
    }

    /// Nested state for `model` named `name` (defaults to the model id).
    pub fn get_state<N: Model>(&self, model: &Rc<N>, name: Option<&str>) -> Option<State<N>> {
        supervisor::get_state(&self.scope(), model, name)
    }

    /// Create a nested state, or return the existing one with that name.
    ///
    /// Fails with [`StorageError::NameTaken`] when the name belongs to a
    /// state of another model.
    pub fn create_state<N: Model>(
        &self,
        model: &Rc<N>,
        params: N::Init,
        name: Option<&str>,
    ) -> Result<State<N>, StorageError> {
        supervisor::create_state(&self.scope(), model, params, name)
    }

    /// Drop a nested state together with its subtree.
    pub fn remove_state<N: Model>(&self, model: &Rc<N>, name: Option<&str>) {
        supervisor::remove_state(&self.scope(), model, name)
    }

    /// Names of the nested states, in creation order.
    pub fn state_names(&self) -> Vec<String> {
        self.node
            .nested
            .nodes()
            .iter()
            .map(|n| n.name.clone())
            .collect()
    }

    /// Send a message from this state towards the root.
    ///
    /// The state itself is the first to consider the message, then each of
    /// its supervisors, then the root subscribers.
    pub fn send_message(&self, message: Message) {
        self.send_message_from(message, ANONYMOUS_SOURCE)
    }

    /// Like [`State::send_message`], labelling the source with `source`.
    pub fn send_message_from(&self, message: Message, source: &str) {
        supervisor::send_message(&self.scope(), message, source)
    }

    /// Observe data changes of this state only.
    pub fn on_new_data<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&M::Data, &[String], &Message) + 'static,
    {
        self.node
            .add_listener(Rc::new(move |data: &dyn Any, path: &[String], message: &Message| {
                if let Some(data) = data.downcast_ref::<M::Data>() {
                    listener(data, path, message);
                }
            }))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.node.remove_listener(id)
    }
}

impl<M: Model> Clone for State<M> {
    fn clone(&self) -> Self {
        Self::from_node(Rc::clone(&self.node))
    }
}

impl<M: Model> PartialEq for State<M> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl<M: Model> fmt::Debug for State<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.node.id)
            .field("path", &self.path())
            .finish()
    }
}
