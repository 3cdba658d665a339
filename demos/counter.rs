//! Counter Board
//!
//! This example demonstrates a small state tree: a board supervising two
//! counters, root subscribers and a snapshot round trip.
//!
//! Key concepts:
//! - Models as pure init / update / subscribe functions
//! - Messages bubbling from a counter to its board and the root
//! - Broadcasts reaching every state
//! - Snapshots restored into a fresh storage
//!
//! Run with: RUST_LOG=statetree=debug cargo run --example counter

use serde::{Deserialize, Serialize};
use serde_json::json;
use statetree::{
    update_and_send, update_data, update_none, Message, Model, StorageBuilder, Subscriptions,
    Update,
};
use std::rc::Rc;

struct Counter;

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
        let next = match message.tag() {
            "inc" => data + message.payload_as::<i64>().unwrap_or(1),
            "reset" => 0,
            _ => return update_none(),
        };

        update_and_send(
            next,
            vec![Message::new("changed").with_payload(json!(next))],
        )
    }

    fn subscribe(&self, _data: &i64) -> Subscriptions {
        Subscriptions::new().on("inc").on("reset")
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Board {
    changes: u32,
}

struct BoardModel;

impl Model for BoardModel {
    type Data = Board;
    type Init = ();

    fn id(&self) -> &str {
        "board"
    }

    fn init(&self, _: &()) -> Update<Board> {
        Update::new(Board::default())
    }

    fn update(&self, data: &Board, _message: &Message) -> Option<Update<Board>> {
        update_data(Board {
            changes: data.changes + 1,
        })
    }

    fn subscribe(&self, _data: &Board) -> Subscriptions {
        Subscriptions::new().passive("changed")
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Counter Board Example ===\n");

    let counter = Rc::new(Counter);
    let board = Rc::new(BoardModel);

    let storage = StorageBuilder::new()
        .model(&counter)
        .model(&board)
        .with_tracing()
        .build()
        .unwrap();

    storage.add_subscriber(Subscriptions::new().on("changed"), |message, source| {
        println!("  root saw {} = {} from {:?}", message.tag(), message.payload(), source);
    });

    let main_board = storage.create_state(&board, (), None).unwrap();
    let left = main_board.create_state(&counter, 0, Some("left")).unwrap();
    let right = main_board.create_state(&counter, 10, Some("right")).unwrap();

    println!("Sending to the left counter:");
    left.send_message(Message::new("inc"));
    left.send_message(Message::new("inc").with_payload(json!(5)));

    println!("\nBroadcasting a reset:");
    storage.broadcast_message(Message::new("reset"));

    println!("\nReplying to board/right:");
    storage.reply_message(
        Message::new("inc").with_payload(json!(2)),
        &["board".to_string(), "right".to_string()],
    );

    println!("\nleft = {}, right = {}", left.data(), right.data());
    println!("board saw {} changes", main_board.data().changes);

    let snapshot = storage.get_snapshot().unwrap();
    println!("\nSnapshot:\n{}", snapshot.to_json_pretty().unwrap());

    let restored = StorageBuilder::new()
        .model(&counter)
        .model(&board)
        .snapshot(snapshot)
        .build()
        .unwrap();

    let right = restored
        .get_state(&board, None)
        .and_then(|b| b.get_state(&counter, Some("right")))
        .unwrap();
    println!("\nRestored right counter: {}", right.data());

    println!("\n=== Example Complete ===");
}
