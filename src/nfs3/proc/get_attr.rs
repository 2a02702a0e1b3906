//! GETATTR (RFC 1813 §3.3.1) — procedure 1.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome};
use crate::xdr;

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => attr::write_status_err(&mut w, e),
        Ok(vfs_handle) => match ctx.vfs.get_attr(&vfs_handle).await {
            Ok(a) => {
                attr::write_status_ok(&mut w);
                attr::fattr3(&mut w, &a);
            }
            Err(e) => attr::write_status_err(&mut w, e),
        },
    }
    Ok(w.into_vec())
}
