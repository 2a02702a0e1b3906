//! SETATTR (RFC 1813 §3.3.2) — procedure 2.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, read_sattr, read_setattr_guard, validate, Context, Outcome};
use crate::vfs::WccData;

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;
    let new_attr = read_sattr(&mut cur)?;
    let guard = read_setattr_guard(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::wcc_data(&mut w, &WccData { before: None, after: None });
        }
        Ok(vfs_handle) => match ctx.vfs.set_attr(&vfs_handle, new_attr, guard).await {
            Ok(wcc) => {
                attr::write_status_ok(&mut w);
                attr::wcc_data(&mut w, &wcc);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::wcc_data(&mut w, &WccData { before: None, after: None });
            }
        },
    }
    Ok(w.into_vec())
}
