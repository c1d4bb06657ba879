//! Fuzz target for DatagramFrame::decode
//!
//! The length prefixes come straight from the network; a `token_size` larger
//! than what follows must be rejected, not trusted.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomcast_proto::{ChatLine, DatagramFrame};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = DatagramFrame::decode(data) else {
        return;
    };

    assert_eq!(2 + frame.room_name.len() + frame.token.len() + frame.message.len(), data.len());

    let _ = frame.room_name_str();
    let _ = frame.token_str();

    let line = ChatLine::render("fuzz", &frame.message);
    let parsed = ChatLine::parse(&line);
    assert_eq!(parsed.display_name, "fuzz");
});
