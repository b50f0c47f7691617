//! Fuzz target for the line framer
//!
//! The first byte picks a chunk size; the rest is fed in chunks to a capped
//! framer. Every returned line must be free of CRLF.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_engine::LineFramer;

fuzz_target!(|data: &[u8]| {
    let Some((&size, stream)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let mut framer = LineFramer::new().with_max_line_len(64);
    for chunk in stream.chunks(size) {
        for line in framer.feed(chunk).flatten() {
            assert!(!line.contains("\r\n"));
        }
    }
});
