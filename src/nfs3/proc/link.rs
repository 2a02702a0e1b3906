//! LINK (RFC 1813 §3.3.15) — procedure 15.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_dirop, read_handle, Context, Outcome};
use crate::vfs::{NfsError, WccData};

/// Procedure 15: LINK. Hard-link creation is out of scope (spec §1
/// Non-goals); arguments are fully decoded so a malformed call still gets
/// `GARBAGE_ARGS`, but the server never consults the mount cache or the
/// `Vfs` layer before reporting `NOTSUPP` per spec §4.8's procedure table.
pub async fn call(_sender: SocketAddr, params: &[u8], _ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let _source_fh = read_handle(&mut cur)?;
    let (_parent_fh, _name) = read_dirop(&mut cur)?;

    let mut w = Writer::new();
    attr::write_status_err(&mut w, NfsError::NotSupp);
    attr::post_op_attr(&mut w, &None);
    attr::wcc_data(&mut w, &WccData { before: None, after: None });
    Ok(w.into_vec())
}
