//! Fuzzes the XDR opaque/string/list codec against arbitrary bytes.
//!
//! Every reader in `nfs_mamont::xdr` must reject malformed input through
//! `Result`/`Option`, never a panic, and a value that round-trips through
//! `write_*` must decode back to itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nfs_mamont::buffer::{Cursor, Writer};
use nfs_mamont::xdr;

fuzz_target!(|data: &[u8]| {
    // Feeding raw fuzz bytes straight at every reader must never panic,
    // no matter how the length prefixes and padding are corrupted.
    let mut cur = Cursor::new(data);
    let _ = xdr::read_opaque(&mut cur, 1 << 20);

    let mut cur = Cursor::new(data);
    let _ = xdr::read_string(&mut cur, 1 << 20);

    let mut cur = Cursor::new(data);
    let _ = xdr::read_array::<8>(&mut cur);

    let mut cur = Cursor::new(data);
    let _ = xdr::read_list(&mut cur, |c| xdr::read_u64(c));

    // Round-trip law: whatever write_opaque accepts, read_opaque must
    // decode back to the identical bytes.
    if data.len() <= 4096 {
        let mut w = Writer::new();
        if xdr::write_opaque(&mut w, data, data.len()).is_ok() {
            let bytes = w.into_vec();
            let mut cur = Cursor::new(&bytes);
            let (out, _) = xdr::read_opaque(&mut cur, data.len()).expect("round trip must decode");
            assert_eq!(out, data);
        }
    }
});
