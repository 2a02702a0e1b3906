//! REMOVE, RMDIR (RFC 1813 §3.3.12-3.3.13) — procedures 12-13.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_dirop, validate, Context, Outcome};
use crate::vfs::WccData;

/// Procedure 12: REMOVE.
pub async fn remove(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::wcc_data(&mut w, &WccData { before: None, after: None });
        }
        Ok(vfs_dir) => match ctx.vfs.remove(&vfs_dir, &name).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::wcc_data(&mut w, &result.directory_wcc);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::wcc_data(&mut w, &WccData { before: None, after: None });
            }
        },
    }
    Ok(w.into_vec())
}

/// Procedure 13: RMDIR.
pub async fn rmdir(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::wcc_data(&mut w, &WccData { before: None, after: None });
        }
        Ok(vfs_dir) => match ctx.vfs.remove_dir(&vfs_dir, &name).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::wcc_data(&mut w, &result.directory_wcc);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::wcc_data(&mut w, &WccData { before: None, after: None });
            }
        },
    }
    Ok(w.into_vec())
}
