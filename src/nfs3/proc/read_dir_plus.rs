//! READDIRPLUS (RFC 1813 §3.3.17) — procedure 17.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, handle, read_handle, validate, write_post_op_handle, Context, Outcome, COOKIEVERF_SIZE};
use crate::vfs::{CookieVerifier, DirectoryCookie, DirectoryPlusEntry};
use crate::xdr;

fn write_entries(
    w: &mut Writer,
    mount_id: u64,
    volume_serial: u64,
    entries: &[DirectoryPlusEntry],
) -> xdr::Result<()> {
    for entry in entries {
        xdr::write_bool(w, true);
        w.append_u64(entry.fileid);
        xdr::write_string(w, &entry.name.0, crate::vfs::MAX_NAME_LEN)?;
        w.append_u64(entry.cookie.0);
        attr::post_op_attr(w, &entry.attr);
        let fh = entry
            .handle
            .as_ref()
            .and_then(|h| handle::FileHandle::from_vfs(mount_id, volume_serial, h));
        write_post_op_handle(w, fh);
    }
    xdr::write_bool(w, false);
    Ok(())
}

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;
    let cookie = DirectoryCookie(xdr::read_u64(&mut cur)?);
    let verifier = CookieVerifier(xdr::read_array::<COOKIEVERF_SIZE>(&mut cur)?);
    let dir_count = xdr::read_u32(&mut cur)?;
    let max_count = xdr::read_u32(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => {
            match ctx.vfs.read_dir_plus(&vfs_handle, cookie, verifier, dir_count, max_count).await {
                Ok(result) => {
                    attr::write_status_ok(&mut w);
                    attr::post_op_attr(&mut w, &result.directory_attr);
                    w.append_bytes(&result.cookie_verifier.0);
                    write_entries(&mut w, fh.mount_id, fh.volume_serial, &result.entries)?;
                    xdr::write_bool(&mut w, result.eof);
                }
                Err(e) => {
                    attr::write_status_err(&mut w, e);
                    attr::post_op_attr(&mut w, &None);
                }
            }
        }
    }
    Ok(w.into_vec())
}
