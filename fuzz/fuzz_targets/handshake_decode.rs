//! Fuzz target for HandshakeFrame::decode and body parsing
//!
//! Arbitrary bytes must either decode or fail with an error, never panic or
//! read past the input. A frame that decodes must re-encode to the same
//! prefix of the input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomcast_proto::{HandshakeBody, HandshakeFrame, HandshakeHeader};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = HandshakeFrame::decode(data) else {
        return;
    };

    let consumed = HandshakeHeader::SIZE + frame.payload.len();
    assert!(consumed <= data.len());

    if let Ok(wire) = frame.to_vec() {
        assert_eq!(&wire[..], &data[..consumed]);
    }

    // Body parsing is selected by the state byte and must not panic either
    let _ = HandshakeBody::from_frame(&frame);
});
