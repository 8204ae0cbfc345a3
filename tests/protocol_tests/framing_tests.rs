//! Framing Tests
//!
//! Reassembly of encoded envelopes from fragmented streams.

use mycelium::protocol::{DecodedMessage, Decoder, Encoder, FrameAssembler, OutboundMessage};
use mycelium::Value;

use super::registry;

fn messages() -> Vec<OutboundMessage> {
    vec![
        OutboundMessage::event("PingRequest", Value::object([("pingId", 1)])),
        OutboundMessage::event("Ordered", Value::object([("alpha", 1), ("mid", -2), ("zeta", 3)])),
        OutboundMessage::event("Scene", Value::Null),
        OutboundMessage::event(
            "Primitives",
            Value::object([
                ("big", Value::from(123_456)),
                ("flag", Value::from(true)),
                ("ratio", Value::from(0.75f32)),
                ("small", Value::from(-5)),
                ("text", Value::from("a somewhat longer string to cross chunk boundaries")),
            ]),
        ),
        OutboundMessage::event("PingRequest", Value::object([("pingId", 2)])),
    ]
}

fn stream() -> Vec<u8> {
    let encoder = Encoder::new(registry());
    messages()
        .iter()
        .flat_map(|m| encoder.encode(m).unwrap().to_vec())
        .collect()
}

/// Feed `chunks` one at a time, decoding every frame as it completes
fn feed<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Vec<DecodedMessage> {
    let decoder = Decoder::new(registry());
    let mut assembler = FrameAssembler::new();
    let mut decoded = Vec::new();

    for chunk in chunks {
        assembler.push(chunk.to_vec());
        for frame in assembler.frames() {
            decoded.push(decoder.decode_message(&frame).unwrap());
        }
    }

    assert!(assembler.is_empty());
    decoded
}

// =============================================================================
// Fragmentation Tests
// =============================================================================

#[test]
fn test_whole_buffer_yields_every_message_in_order() {
    let bytes = stream();
    let decoded = feed([&bytes[..]]);

    let events: Vec<&str> = decoded.iter().map(|m| m.event.as_str()).collect();
    assert_eq!(events, vec!["PingRequest", "Ordered", "Scene", "Primitives", "PingRequest"]);
    assert_eq!(decoded[4].payload.get("pingId"), Some(&Value::Int(2)));
}

#[test]
fn test_fixed_size_chunks_match_whole_buffer() {
    let bytes = stream();
    let whole = feed([&bytes[..]]);

    for size in [1, 2, 3, 4, 5, 7, 11, 64] {
        let fragmented = feed(bytes.chunks(size));
        assert_eq!(fragmented, whole, "chunk size {}", size);
    }
}

#[test]
fn test_irregular_chunks_match_whole_buffer() {
    let bytes = stream();
    let whole = feed([&bytes[..]]);

    // Deterministic pseudo-random cut points
    let mut seed: u32 = 0x2545_F491;
    let mut chunks = Vec::new();
    let mut rest = &bytes[..];
    while !rest.is_empty() {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let size = 1 + (seed >> 16) as usize % 9;
        let (head, tail) = rest.split_at(size.min(rest.len()));
        chunks.push(head);
        rest = tail;
    }

    assert_eq!(feed(chunks), whole);
}

#[test]
fn test_partial_delivery() {
    let encoder = Encoder::new(registry());
    let a = encoder.encode(&messages()[0]).unwrap();
    let b = encoder.encode(&messages()[1]).unwrap();

    let decoder = Decoder::new(registry());
    let mut assembler = FrameAssembler::new();

    let mut first = a.to_vec();
    first.extend_from_slice(&b[..3]);
    assembler.push(first);

    let frames: Vec<_> = assembler.frames().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(decoder.decode_message(&frames[0]).unwrap().event, "PingRequest");
    assert_eq!(assembler.buffered_len(), 3);

    assembler.push(b.slice(3..));
    let frames: Vec<_> = assembler.frames().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(decoder.decode_message(&frames[0]).unwrap().event, "Ordered");
    assert!(assembler.is_empty());
}

#[test]
fn test_discard_abandons_partial_message() {
    let bytes = stream();
    let mut assembler = FrameAssembler::new();
    assembler.push(bytes[..bytes.len() - 1].to_vec());

    assert_eq!(assembler.frames().count(), 4);
    let dropped = assembler.discard();
    assert!(dropped > 0);
    assert!(assembler.next_frame().is_none());
}
