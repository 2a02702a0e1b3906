//! WRITE (RFC 1813 §3.3.7) — procedure 7.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome, MAX_DATA_LEN};
use crate::vfs::{WccData, WriteMode};
use crate::xdr;

fn read_stable(cur: &mut Cursor) -> xdr::Result<WriteMode> {
    match xdr::read_u32(cur)? {
        0 => Ok(WriteMode::Unstable),
        1 => Ok(WriteMode::DataSync),
        2 => Ok(WriteMode::FileSync),
        _ => Err(xdr::Invalid),
    }
}

fn write_stable(w: &mut Writer, mode: WriteMode) {
    let code = match mode {
        WriteMode::Unstable => 0,
        WriteMode::DataSync => 1,
        WriteMode::FileSync => 2,
    };
    w.append_u32(code);
}

pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;
    let offset = xdr::read_u64(&mut cur)?;
    let _declared_count = xdr::read_u32(&mut cur)?;
    let stable = read_stable(&mut cur)?;
    let (data, _) = xdr::read_opaque(&mut cur, MAX_DATA_LEN)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::wcc_data(&mut w, &WccData { before: None, after: None });
        }
        Ok(vfs_handle) => match ctx.vfs.write(&vfs_handle, offset, &data, stable).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::wcc_data(&mut w, &WccData { before: None, after: result.file_attr.clone() });
                w.append_u32(result.count);
                write_stable(&mut w, result.committed);
                // The write verifier is a core-level, per-session invariant
                // (spec §4.8 #21), not a host-adapter detail, so it comes
                // from `ctx.verifier` rather than the adapter's own result.
                w.append_bytes(&ctx.verifier);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::wcc_data(&mut w, &WccData { before: None, after: None });
            }
        },
    }
    Ok(w.into_vec())
}
