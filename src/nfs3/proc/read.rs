//! READ (RFC 1813 §3.3.6) — procedure 6.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome, MAX_DATA_LEN};
use crate::xdr;

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;
    let offset = xdr::read_u64(&mut cur)?;
    let count = xdr::read_u32(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.read(&vfs_handle, offset, count).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &result.file_attr);
                w.append_u32(result.data.len() as u32);
                xdr::write_bool(&mut w, result.eof);
                xdr::write_opaque(&mut w, &result.data, MAX_DATA_LEN).map_err(|_| xdr::Invalid)?;
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}
