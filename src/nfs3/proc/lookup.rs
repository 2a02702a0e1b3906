//! LOOKUP (RFC 1813 §3.3.3) — procedure 3.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, handle, read_dirop, validate, write_handle, Context, Outcome};

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_dir) => match ctx.vfs.lookup(&vfs_dir, &name).await {
            Ok(result) => {
                let child =
                    handle::FileHandle::from_vfs(dir_fh.mount_id, dir_fh.volume_serial, &result.handle)
                        .ok_or(crate::xdr::Invalid)?;
                attr::write_status_ok(&mut w);
                write_handle(&mut w, child);
                attr::post_op_attr(&mut w, &Some(result.object_attr));
                attr::post_op_attr(&mut w, &result.directory_attr);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}
