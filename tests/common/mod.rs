//! Models and helpers shared by the integration tests.

#![allow(dead_code)]

use statetree::{
    update_and_send, update_data, update_none, Event, Message, Model, Storage, Subscriptions,
    Update,
};
use std::cell::RefCell;
use std::rc::Rc;

pub struct Counter;

impl Model for Counter {
    type Data = i64;
    type Init = i64;

    fn id(&self) -> &str {
        "counter"
    }

    fn init(&self, start: &i64) -> Update<i64> {
        Update::new(*start)
    }

    fn update(&self, data: &i64, message: &Message) -> Option<Update<i64>> {
        match message.tag() {
            "inc" => update_data(data + 1),
            _ => update_none(),
        }
    }

    fn subscribe(&self, _data: &i64) -> Subscriptions {
        Subscriptions::new().on("inc")
    }
}

/// Records the tag of every message it is updated with.
pub struct Recorder {
    id: String,
    subscriptions: Subscriptions,
    replies: Vec<(String, String)>,
    init_messages: Vec<String>,
}

impl Recorder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            subscriptions: Subscriptions::new(),
            replies: Vec::new(),
            init_messages: Vec::new(),
        }
    }

    pub fn subscriptions(mut self, subscriptions: Subscriptions) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Send `send` whenever a message tagged `on` is handled.
    pub fn reply(mut self, on: &str, send: &str) -> Self {
        self.replies.push((on.to_string(), send.to_string()));
        self
    }

    pub fn init_sending(mut self, tag: &str) -> Self {
        self.init_messages.push(tag.to_string());
        self
    }
}

impl Model for Recorder {
    type Data = Vec<String>;
    type Init = ();

    fn id(&self) -> &str {
        &self.id
    }

    fn init(&self, _: &()) -> Update<Vec<String>> {
        Update::with_messages(
            Vec::new(),
            self.init_messages.iter().map(Message::new).collect(),
        )
    }

    fn update(&self, data: &Vec<String>, message: &Message) -> Option<Update<Vec<String>>> {
        let mut seen = data.clone();
        seen.push(message.tag().to_string());

        let messages = self
            .replies
            .iter()
            .filter(|(on, _)| on == message.tag())
            .map(|(_, send)| Message::new(send))
            .collect();

        update_and_send(seen, messages)
    }

    fn subscribe(&self, _data: &Vec<String>) -> Subscriptions {
        self.subscriptions.clone()
    }
}

/// A lifecycle event reduced to what the tests assert on.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub name: &'static str,
    pub path: Vec<String>,
    pub tag: Option<String>,
}

/// Record every lifecycle event emitted by `storage`.
pub fn record_events(storage: &Storage) -> Rc<RefCell<Vec<Recorded>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);

    storage.add_observer(Rc::new(move |event: &Event<'_>| {
        let (path, tag) = match *event {
            Event::StateCreated { path, .. } | Event::StateRemoved { path, .. } => {
                (path.to_vec(), None)
            }
            Event::StateNewData { path, message, .. }
            | Event::MessageMatched { path, message, .. } => {
                (path.to_vec(), Some(message.tag().to_string()))
            }
            Event::MessageQueued { message, source }
            | Event::UnhandledMessage { message, source } => {
                (source.to_vec(), Some(message.tag().to_string()))
            }
            Event::SnapshotRestore { .. } | Event::SnapshotRestored => (Vec::new(), None),
        };

        sink.borrow_mut().push(Recorded {
            name: event.name(),
            path,
            tag,
        });
    }));

    log
}

/// Recorded events called `name`.
pub fn named(log: &Rc<RefCell<Vec<Recorded>>>, name: &str) -> Vec<Recorded> {
    log.borrow()
        .iter()
        .filter(|r| r.name == name)
        .cloned()
        .collect()
}

/// Install a test subscriber controlled by `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn path(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
