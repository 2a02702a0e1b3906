//! ACCESS (RFC 1813 §3.3.4) — procedure 4.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome};
use crate::vfs::AccessMask;
use crate::xdr;

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;
    let requested = AccessMask::from_bits(xdr::read_u32(&mut cur)?);

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.access(&vfs_handle, requested).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &result.file_attr);
                w.append_u32(result.granted.bits());
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}
