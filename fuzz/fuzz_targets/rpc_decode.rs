//! Fuzzes `rpc::decode_call` against arbitrary bytes.
//!
//! The transport loops treat a malformed envelope as a message to drop
//! silently (spec: bad input never takes the server down), so decoding
//! must return `None` rather than panicking for any input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nfs_mamont::rpc;

fuzz_target!(|data: &[u8]| {
    let _ = rpc::decode_call(data);
});
