//! Fuzz target for IRC message parsing and dispatch
//!
//! Feeds arbitrary lines to the parser and, when they parse, to a dispatcher
//! that has joined a channel. Neither may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_engine::{Dispatcher, Message};
use std::str;

fuzz_target!(|data: &[u8]| {
    // Only fuzz valid UTF-8 strings to focus on protocol-level issues
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > 8191 {
            return;
        }

        if let Ok(msg) = Message::parse(input) {
            let mut dispatcher = Dispatcher::new("bot", true);
            if let Ok(join) = Message::parse(":bot!b@h JOIN #chan") {
                let _ = dispatcher.dispatch(&join);
            }
            let _ = dispatcher.dispatch(&msg);
        }
    }
});
