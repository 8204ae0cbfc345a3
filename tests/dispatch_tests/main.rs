//! Dispatch Tests
//!
//! Routing assembled messages to subscribers.

use std::sync::Arc;

use mycelium::protocol::{Encoder, OutboundMessage};
use mycelium::schema::{DefinitionTable, Descriptor, SchemaRegistry};
use mycelium::{DecodedMessage, Dispatcher, MyceliumError, Value};
use parking_lot::Mutex;

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::builder()
            .register(
                "PingRequest",
                10,
                Descriptor::object([("pingId", Descriptor::int16())]),
                DefinitionTable::new(),
            )
            .register(
                "ChatMessage",
                11,
                Descriptor::object([("text", Descriptor::string())]),
                DefinitionTable::new(),
            )
            .build()
            .unwrap(),
    )
}

fn envelope(event: &str, payload: Value) -> Vec<u8> {
    Encoder::new(registry())
        .encode(&OutboundMessage::event(event, payload))
        .unwrap()
        .to_vec()
}

fn recorder() -> (Arc<Mutex<Vec<DecodedMessage>>>, impl FnMut(&DecodedMessage) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |m: &DecodedMessage| sink.lock().push(m.clone()))
}

// =============================================================================
// Subscription Tests
// =============================================================================

#[test]
fn test_handlers_see_only_their_event() {
    let mut dispatcher = Dispatcher::new(registry());
    let (pings, on_ping) = recorder();
    let (chats, on_chat) = recorder();
    dispatcher.subscribe("PingRequest", on_ping).unwrap();
    dispatcher.subscribe("ChatMessage", on_chat).unwrap();

    let mut stream = envelope("ChatMessage", Value::object([("text", "hi")]));
    stream.extend(envelope("PingRequest", Value::object([("pingId", 4)])));
    stream.extend(envelope("ChatMessage", Value::object([("text", "bye")])));
    dispatcher.handle_chunk(stream);

    assert_eq!(pings.lock().len(), 1);
    let texts: Vec<Value> = chats
        .lock()
        .iter()
        .map(|m| m.payload.get("text").cloned().unwrap())
        .collect();
    assert_eq!(texts, vec![Value::from("hi"), Value::from("bye")]);
}

#[test]
fn test_catch_all_sees_everything_in_order() {
    let mut dispatcher = Dispatcher::new(registry());
    let (all, on_any) = recorder();
    dispatcher.subscribe_all(on_any);

    let mut stream = envelope("PingRequest", Value::object([("pingId", 1)]));
    stream.extend(envelope("ChatMessage", Value::object([("text", "x")])));
    for byte in stream {
        dispatcher.handle_chunk(vec![byte]);
    }

    let events: Vec<String> = all.lock().iter().map(|m| m.event.clone()).collect();
    assert_eq!(events, vec!["PingRequest", "ChatMessage"]);
}

#[test]
fn test_subscribe_unknown_event_fails() {
    let mut dispatcher = Dispatcher::new(registry());
    let err = dispatcher.subscribe("Missing", |_| {}).unwrap_err();
    assert!(matches!(err, MyceliumError::UnknownEvent(_)));
}

// =============================================================================
// Partial Delivery Tests
// =============================================================================

#[test]
fn test_partial_delivery_dispatches_a_then_b() {
    let mut dispatcher = Dispatcher::new(registry());
    let (all, on_any) = recorder();
    dispatcher.subscribe_all(on_any);

    let a = envelope("PingRequest", Value::object([("pingId", 1)]));
    let b = envelope("ChatMessage", Value::object([("text", "later")]));

    let mut first = a.clone();
    first.extend_from_slice(&b[..3]);
    let outcomes = dispatcher.handle_chunk(first);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());
    assert_eq!(all.lock().len(), 1);

    let outcomes = dispatcher.handle_chunk(b[3..].to_vec());
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].as_ref().unwrap().event, "ChatMessage");
    assert_eq!(all.lock().len(), 2);
    assert_eq!(dispatcher.pending_bytes(), 0);
}

#[test]
fn test_decode_failure_is_isolated() {
    let mut dispatcher = Dispatcher::new(registry());
    let (all, on_any) = recorder();
    dispatcher.subscribe_all(on_any);

    // Truncated PingRequest body, then a good ChatMessage
    let mut stream = vec![0x00, 0x04, 0x00, 10, 0x01, 0x00];
    stream.extend(envelope("ChatMessage", Value::object([("text", "ok")])));
    let outcomes = dispatcher.handle_chunk(stream);

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Err(MyceliumError::TruncatedPayload { .. })));
    assert!(outcomes[1].is_ok());
    assert_eq!(all.lock().len(), 1);
}

#[test]
fn test_close_discards_partial_tail() {
    let mut dispatcher = Dispatcher::new(registry());
    let a = envelope("PingRequest", Value::object([("pingId", 1)]));
    dispatcher.handle_chunk(a[..4].to_vec());

    assert_eq!(dispatcher.pending_bytes(), 4);
    assert_eq!(dispatcher.close(), 4);
    assert_eq!(dispatcher.pending_bytes(), 0);
}
