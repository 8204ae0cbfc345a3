//! Network Tests
//!
//! Client against an in-process TCP server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mycelium::protocol::{Encoder, OutboundMessage};
use mycelium::schema::{DefinitionTable, Descriptor, SchemaRegistry};
use mycelium::{Client, ClientEvent, Config, MyceliumError, Value};

const WAIT: Duration = Duration::from_secs(5);

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::builder()
            .register(
                "PingRequest",
                0x0001,
                Descriptor::object([("pingId", Descriptor::int16())]),
                DefinitionTable::new(),
            )
            .register(
                "PingResponse",
                0x0002,
                Descriptor::object([("pingId", Descriptor::int16()), ("note", Descriptor::string())]),
                DefinitionTable::new(),
            )
            .build()
            .unwrap(),
    )
}

fn config(addr: SocketAddr) -> Config {
    Config::builder()
        .server_addr(addr.to_string())
        .connect_timeout_ms(2000)
        .build()
}

fn encode(event: &str, payload: Value) -> Vec<u8> {
    Encoder::new(registry())
        .encode(&OutboundMessage::event(event, payload))
        .unwrap()
        .to_vec()
}

fn response(ping_id: i32) -> Vec<u8> {
    encode(
        "PingResponse",
        Value::object([("note", Value::from("pong")), ("pingId", Value::from(ping_id))]),
    )
}

/// Accept one connection and hand it to `serve` on a background thread
fn spawn_server<T, F>(serve: F) -> (SocketAddr, thread::JoinHandle<T>)
where
    T: Send + 'static,
    F: FnOnce(TcpStream) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (socket, _) = listener.accept().unwrap();
        serve(socket)
    });
    (addr, handle)
}

fn next_event(client: &Client) -> ClientEvent {
    client.events().recv_timeout(WAIT).expect("no event before timeout")
}

// =============================================================================
// Exchange Tests
// =============================================================================

#[test]
fn test_send_and_receive_fragmented_responses() {
    let (addr, server) = spawn_server(|mut socket| {
        let mut request = [0u8; 7];
        socket.read_exact(&mut request).unwrap();

        let mut stream = response(7);
        stream.extend(response(8));
        for chunk in stream.chunks(3) {
            socket.write_all(chunk).unwrap();
            socket.flush().unwrap();
            thread::sleep(Duration::from_millis(2));
        }
        request
    });

    let client = Client::connect(&config(addr), registry()).unwrap();
    client
        .send(&OutboundMessage::event("PingRequest", Value::object([("pingId", 7)])))
        .unwrap();

    for expected in [7, 8] {
        match next_event(&client) {
            ClientEvent::Message(message) => {
                assert_eq!(message.event, "PingResponse");
                assert_eq!(message.payload.get("pingId"), Some(&Value::Int(expected)));
                assert_eq!(message.payload.get("note"), Some(&Value::from("pong")));
            }
            other => panic!("Expected message, got {:?}", other),
        }
    }

    // Server hung up after writing
    assert!(matches!(next_event(&client), ClientEvent::Closed { .. }));

    let request = server.join().unwrap();
    assert_eq!(request, [0x00, 0x05, 0x00, 0x01, 0x01, 0x00, 0x07]);
    client.shutdown().unwrap();
}

#[test]
fn test_decode_failure_keeps_connection_open() {
    let (addr, server) = spawn_server(|mut socket| {
        // Unknown id, then a valid response
        let mut stream = vec![0x00, 0x03, 0x7F, 0x7F, 0x01];
        stream.extend(response(1));
        socket.write_all(&stream).unwrap();
        thread::sleep(Duration::from_millis(50));
    });

    let client = Client::connect(&config(addr), registry()).unwrap();

    match next_event(&client) {
        ClientEvent::DecodeFailed(MyceliumError::UnknownMessageId(id)) => assert_eq!(id, 0x7F7F),
        other => panic!("Expected decode failure, got {:?}", other),
    }
    assert!(matches!(next_event(&client), ClientEvent::Message(_)));
    assert!(matches!(next_event(&client), ClientEvent::Closed { .. }));

    server.join().unwrap();
}

#[test]
fn test_partial_message_at_close_is_dropped_silently() {
    let (addr, server) = spawn_server(|mut socket| {
        let stream = response(3);
        socket.write_all(&stream[..stream.len() - 1]).unwrap();
    });

    let client = Client::connect(&config(addr), registry()).unwrap();
    match next_event(&client) {
        ClientEvent::Closed { reason } => assert_eq!(reason, "end of stream"),
        other => panic!("Expected close, got {:?}", other),
    }

    server.join().unwrap();
}

#[test]
fn test_encode_error_sends_nothing() {
    let (addr, server) = spawn_server(|mut socket| {
        let mut buf = Vec::new();
        socket.read_to_end(&mut buf).unwrap();
        buf
    });

    let client = Client::connect(&config(addr), registry()).unwrap();
    let err = client
        .send(&OutboundMessage::event("PingRequest", Value::object([("pingId", "seven")])))
        .unwrap_err();
    assert!(matches!(err, MyceliumError::EncodeTargetMismatch { .. }));
    assert!(!err.is_fatal());

    client.shutdown().unwrap();
    assert!(server.join().unwrap().is_empty());
}

// =============================================================================
// Connection Setup Tests
// =============================================================================

#[test]
fn test_shutdown_with_idle_server() {
    let (addr, server) = spawn_server(|mut socket| {
        let mut buf = [0u8; 1];
        // Returns once the client shuts the socket down
        let _ = socket.read(&mut buf);
    });

    let client = Client::connect(&config(addr), registry()).unwrap();
    assert_eq!(client.peer_addr(), addr);
    client.shutdown().unwrap();

    server.join().unwrap();
}

#[test]
fn test_connect_refused() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = Client::connect(&config(addr), registry()).unwrap_err();
    assert!(matches!(err, MyceliumError::Network(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().chunk_size(0).build();
    let err = Client::connect(&config, registry()).unwrap_err();
    assert!(matches!(err, MyceliumError::Config(_)));
}
