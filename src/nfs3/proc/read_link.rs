//! READLINK (RFC 1813 §3.3.5) — procedure 5.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome};
use crate::vfs::MAX_PATH_LEN;
use crate::xdr;

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.read_link(&vfs_handle).await {
            Ok((target, file_attr)) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &file_attr);
                xdr::write_string(&mut w, &target.0, MAX_PATH_LEN).map_err(|_| xdr::Invalid)?;
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}
