//! Internal node representation.
//!
//! Ownership flows strictly downward: a node is owned by the `Nested` map of
//! its supervisor, the root container owns the top-level map. Supervisor
//! links are weak and only used to walk upward.

use super::ids::ListenerId;
use super::storage::StorageInner;
use crate::core::{Message, StateData, StatePath};
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) type DataListener = Rc<dyn Fn(&dyn Any, &[String], &Message)>;

/// A live instance of a model.
pub(crate) struct NodeInner {
    /// Registry key of the model.
    pub(crate) id: String,
    /// Key in the supervisor's nested map.
    pub(crate) name: String,
    data: RefCell<StateData>,
    pub(crate) supervisor: Supervisor,
    pub(crate) nested: Nested,
    listeners: RefCell<Vec<(ListenerId, DataListener)>>,
}

impl NodeInner {
    pub(crate) fn new(id: String, name: String, data: StateData, supervisor: Supervisor) -> Rc<Self> {
        Rc::new(Self {
            id,
            name,
            data: RefCell::new(data),
            supervisor,
            nested: Nested::default(),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Current data; replaced wholesale, never mutated in place.
    pub(crate) fn data(&self) -> StateData {
        Rc::clone(&self.data.borrow())
    }

    pub(crate) fn replace_data(&self, data: StateData) {
        *self.data.borrow_mut() = data;
    }

    pub(crate) fn path(self: &Rc<Self>) -> StatePath {
        Scope::State(Rc::clone(self)).path()
    }

    pub(crate) fn storage(self: &Rc<Self>) -> Option<Rc<StorageInner>> {
        Scope::State(Rc::clone(self)).storage()
    }

    pub(crate) fn add_listener(&self, listener: DataListener) -> ListenerId {
        let id = ListenerId::generate();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    /// Node-scoped `stateNewData` notification.
    pub(crate) fn notify_new_data(&self, data: &dyn Any, path: &[String], message: &Message) {
        let listeners: Vec<DataListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        for listener in listeners {
            listener(data, path, message);
        }
    }
}

/// Non-owning link from a node to whatever supervises it.
#[derive(Clone)]
pub(crate) enum Supervisor {
    Storage(Weak<StorageInner>),
    State(Weak<NodeInner>),
}

impl Supervisor {
    pub(crate) fn upgrade(&self) -> Option<Scope> {
        match self {
            Self::Storage(s) => s.upgrade().map(Scope::Storage),
            Self::State(s) => s.upgrade().map(Scope::State),
        }
    }
}

/// Anything that can supervise states: the root container or a state.
#[derive(Clone)]
pub(crate) enum Scope {
    Storage(Rc<StorageInner>),
    State(Rc<NodeInner>),
}

impl Scope {
    pub(crate) fn nested(&self) -> &Nested {
        match self {
            Self::Storage(s) => &s.nested,
            Self::State(s) => &s.nested,
        }
    }

    pub(crate) fn downgrade(&self) -> Supervisor {
        match self {
            Self::Storage(s) => Supervisor::Storage(Rc::downgrade(s)),
            Self::State(s) => Supervisor::State(Rc::downgrade(s)),
        }
    }

    /// Names from the root down to this scope, empty for the root.
    pub(crate) fn path(&self) -> StatePath {
        let mut path = Vec::new();
        let mut current = self.clone();

        while let Scope::State(node) = current {
            path.push(node.name.clone());

            match node.supervisor.upgrade() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        path.reverse();
        path
    }

    pub(crate) fn storage(&self) -> Option<Rc<StorageInner>> {
        let mut current = self.clone();

        loop {
            match current {
                Scope::Storage(storage) => return Some(storage),
                Scope::State(node) => current = node.supervisor.upgrade()?,
            }
        }
    }
}

/// Insertion-ordered map of child states.
#[derive(Default)]
pub(crate) struct Nested {
    entries: RefCell<Vec<(String, Rc<NodeInner>)>>,
}

impl Nested {
    pub(crate) fn get(&self, name: &str) -> Option<Rc<NodeInner>> {
        self.entries
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| Rc::clone(node))
    }

    /// Append a new child. An occupied name is left untouched and `false`
    /// is returned.
    pub(crate) fn insert(&self, name: String, node: Rc<NodeInner>) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|(n, _)| *n == name) {
            return false;
        }

        entries.push((name, node));
        true
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Rc<NodeInner>> {
        let mut entries = self.entries.borrow_mut();
        let index = entries.iter().position(|(n, _)| n == name)?;
        Some(entries.remove(index).1)
    }

    /// Children in insertion order, detached from the map so callers may
    /// mutate the tree while iterating.
    pub(crate) fn nodes(&self) -> Vec<Rc<NodeInner>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, node)| Rc::clone(node))
            .collect()
    }

    /// Swap the whole map, dropping the previous children.
    pub(crate) fn replace(&self, entries: Vec<(String, Rc<NodeInner>)>) {
        let previous = std::mem::replace(&mut *self.entries.borrow_mut(), entries);
        drop(previous);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}
