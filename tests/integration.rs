//! Integration tests for the live collection.

use live_collection::{
    ChildEvent, ChildEventSource, ChildKey, CollectionSnapshot, JsonMapper, LiveCollection,
    OrderedCollection, StructuralDelta, SubscriptionConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Message {
    author: String,
    text: String,
}

fn order<T>(c: &OrderedCollection<T>) -> Vec<&str> {
    c.keys().iter().map(ChildKey::as_str).collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// --- Ordering Properties ---

#[test]
fn test_order_convergence() {
    let mut c = OrderedCollection::new();
    c.apply(ChildEvent::added("A", 1, None));
    c.apply(ChildEvent::added("B", 2, Some("A")));
    c.apply(ChildEvent::added("C", 3, Some("B")));

    assert_eq!(order(&c), vec!["A", "B", "C"]);
    assert_eq!(c.len(), 3);
}

#[test]
fn test_duplicate_delivery_yields_one_delta() {
    let mut c = OrderedCollection::new();
    let event = ChildEvent::added("A", "x", None);

    let deltas: Vec<_> = (0..2).filter_map(|_| c.apply(event.clone())).collect();
    assert_eq!(deltas.len(), 1);
    assert_eq!(c.len(), 1);
}

#[test]
fn test_remove_then_readd() {
    let mut c = OrderedCollection::new();
    c.apply(ChildEvent::added("A", 1, None));
    c.apply(ChildEvent::removed("A"));
    c.apply(ChildEvent::added("A", 2, None));

    assert_eq!(c.len(), 1);
    assert_eq!(c.index_for_key("A"), Some(0));
    assert_eq!(*c.item_for_key("A").unwrap(), 2);
}

#[test]
fn test_unresolved_anchor_stays_pinned() {
    let mut c = OrderedCollection::new();
    let delta = c.apply(ChildEvent::added("B", 2, Some("A"))).unwrap();
    assert_eq!(delta.final_index(), Some(0));

    c.apply(ChildEvent::added("A", 1, None));

    // No re-sort when the anchor shows up later; one of each key.
    assert_eq!(c.len(), 2);
    assert_eq!(order(&c), vec!["A", "B"]);
    assert_eq!(c.keys().iter().filter(|k| k.as_str() == "B").count(), 1);

    // Fallback entries stay at the tail of a longer list.
    c.apply(ChildEvent::added("Z", 26, Some("missing")));
    c.apply(ChildEvent::added("A2", 3, Some("A")));
    assert_eq!(order(&c), vec!["A", "A2", "B", "Z"]);
}

#[test]
fn test_move_correctness() {
    let mut c = OrderedCollection::new();
    c.apply(ChildEvent::added("A", 1, None));
    c.apply(ChildEvent::added("B", 2, Some("A")));
    c.apply(ChildEvent::added("C", 3, Some("B")));

    let delta = c.apply(ChildEvent::moved("A", None, Some("C"))).unwrap();
    assert_eq!(order(&c), vec!["B", "C", "A"]);
    assert_eq!(
        delta,
        StructuralDelta::MovedFromTo {
            from: 0,
            to: 2,
            item: 1,
            key: ChildKey::from("A"),
        }
    );
}

#[test]
fn test_change_in_place() {
    let mut c = OrderedCollection::new();
    c.apply(ChildEvent::added("A", "a", None));
    c.apply(ChildEvent::added("B", "b", Some("A")));
    c.apply(ChildEvent::added("C", "c", Some("B")));

    c.apply(ChildEvent::changed("B", "b2", Some("A")));
    assert_eq!(order(&c), vec!["A", "B", "C"]);
    assert_eq!(*c.item_for_key("B").unwrap(), "b2");
    assert_eq!(*c.item_for_key("A").unwrap(), "a");
    assert_eq!(*c.item_for_key("C").unwrap(), "c");
}

// --- Realistic Workflow Tests ---

#[test]
fn test_chat_room_workflow() {
    init_tracing();
    let source = ChildEventSource::new();
    let handle = source.subscribe("rooms/general/messages", SubscriptionConfig::default());
    let mut live: LiveCollection<Message, _> = LiveCollection::new(handle, JsonMapper::new());

    let location = "rooms/general/messages";
    source.publish(
        location,
        ChildEvent::added("m1", json!({"author": "ana", "text": "hello"}), None),
    );
    source.publish(
        location,
        ChildEvent::added("m2", json!({"author": "bo", "text": "hi!"}), Some("m1")),
    );
    source.publish(
        location,
        ChildEvent::added("m3", json!({"author": "ana", "text": "typo"}), Some("m2")),
    );
    source.publish(
        location,
        ChildEvent::changed("m3", json!({"author": "ana", "text": "fixed"}), Some("m2")),
    );
    source.publish(location, ChildEvent::removed("m2"));

    let mut deltas: Vec<StructuralDelta<_>> = Vec::new();
    assert_eq!(live.pump(&mut deltas).unwrap(), 5);

    let c = live.collection();
    assert_eq!(order(c), vec!["m1", "m3"]);
    assert_eq!(c.item_at(1).unwrap().text, "fixed");
    assert!(matches!(deltas[4], StructuralDelta::RemovedAt { index: 1, .. }));
    assert_eq!(deltas[4].key().as_str(), "m2");
}

#[test]
fn test_transport_thread_feeds_consumer() {
    let source = ChildEventSource::new();
    let handle = source.subscribe("scores", SubscriptionConfig::default());
    let mut live: LiveCollection<u32, _> = LiveCollection::new(handle, JsonMapper::new());

    let transport = source.clone();
    let producer = thread::spawn(move || {
        let mut prev: Option<String> = None;
        for i in 0..100u32 {
            let key = format!("s{:03}", i);
            transport.publish("scores", ChildEvent::added(key.as_str(), json!(i), prev.as_deref()));
            prev = Some(key);
        }
        transport.close("scores");
    });

    let mut applied = 0;
    while live.is_active() {
        if live.next_delta(Duration::from_millis(500)).unwrap().is_some() {
            applied += 1;
        }
    }
    producer.join().unwrap();

    assert_eq!(applied, 100);
    let c = live.collection();
    assert_eq!(c.len(), 100);
    assert_eq!(c.key_at(0).unwrap().as_str(), "s000");
    assert_eq!(*c.item_at(99).unwrap(), 99);
}

#[test]
fn test_independent_subscribers() {
    let source = ChildEventSource::new();
    let mut ui: LiveCollection<String, _> = LiveCollection::new(
        source.subscribe("todo", SubscriptionConfig::default()),
        JsonMapper::new(),
    );
    let mut mirror: LiveCollection<String, _> = LiveCollection::new(
        source.subscribe("todo", SubscriptionConfig::default()),
        JsonMapper::new(),
    );

    source.publish("todo", ChildEvent::added("t1", json!("milk"), None));
    ui.pump(&mut Vec::<StructuralDelta<_>>::new()).unwrap();

    source.publish("todo", ChildEvent::added("t2", json!("eggs"), Some("t1")));
    mirror.cancel();
    source.publish("todo", ChildEvent::removed("t1"));

    ui.pump(&mut Vec::<StructuralDelta<_>>::new()).unwrap();
    mirror.pump(&mut Vec::<StructuralDelta<_>>::new()).unwrap();

    assert_eq!(order(ui.collection()), vec!["t2"]);
    // Cancelled before it ever pumped; its state is simply empty.
    assert!(mirror.collection().is_empty());
}

#[test]
fn test_restart_from_saved_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("messages.json");

    let source = ChildEventSource::new();
    let mut live: LiveCollection<Message, _> = LiveCollection::new(
        source.subscribe("inbox", SubscriptionConfig::default()),
        JsonMapper::new(),
    );
    source.publish(
        "inbox",
        ChildEvent::added("a", json!({"author": "x", "text": "first"}), None),
    );
    source.publish(
        "inbox",
        ChildEvent::added("b", json!({"author": "y", "text": "second"}), Some("a")),
    );
    live.pump(&mut Vec::<StructuralDelta<_>>::new()).unwrap();
    live.cancel();
    live.collection().snapshot().save(&path).unwrap();

    // New process: restore, then keep syncing.
    let snapshot: CollectionSnapshot<Message> = CollectionSnapshot::load(&path).unwrap();
    let restored = OrderedCollection::restore(snapshot).unwrap();
    let mut live = LiveCollection::with_collection(
        source.subscribe("inbox", SubscriptionConfig::default()),
        JsonMapper::new(),
        restored,
    );

    // Redelivered add is absorbed, the new one lands after its anchor.
    source.publish(
        "inbox",
        ChildEvent::added("a", json!({"author": "x", "text": "first"}), None),
    );
    source.publish(
        "inbox",
        ChildEvent::added("c", json!({"author": "z", "text": "third"}), Some("b")),
    );
    let mut deltas: Vec<StructuralDelta<_>> = Vec::new();
    assert_eq!(live.pump(&mut deltas).unwrap(), 1);
    assert_eq!(order(live.collection()), vec!["a", "b", "c"]);
}
