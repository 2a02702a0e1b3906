//! FSSTAT, FSINFO, PATHCONF, COMMIT (RFC 1813 §3.3.18-3.3.21) — procedures 18-21.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_handle, validate, Context, Outcome};
use crate::xdr;

fn nfstime3(w: &mut Writer, t: crate::vfs::FileTime) {
    w.append_u32(t.seconds as u32);
    w.append_u32(t.nanos);
}

/// Procedure 18: FSSTAT.
pub async fn fsstat(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.fs_stat(&vfs_handle).await {
            Ok(stat) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &stat.file_attr);
                w.append_u64(stat.total_bytes);
                w.append_u64(stat.free_bytes);
                w.append_u64(stat.available_bytes);
                w.append_u64(stat.total_files);
                w.append_u64(stat.free_files);
                w.append_u64(stat.available_files);
                w.append_u32(stat.invarsec);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}

/// Procedure 19: FSINFO.
pub async fn fsinfo(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.fs_info(&vfs_handle).await {
            Ok(info) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &info.file_attr);
                w.append_u32(info.read_max);
                w.append_u32(info.read_pref);
                w.append_u32(info.read_multiple);
                w.append_u32(info.write_max);
                w.append_u32(info.write_pref);
                w.append_u32(info.write_multiple);
                w.append_u32(info.directory_pref);
                w.append_u64(info.max_file_size);
                nfstime3(&mut w, info.time_delta);
                w.append_u32(info.properties.bits());
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}

/// Procedure 20: PATHCONF.
pub async fn pathconf(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let fh = read_handle(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, fh) {
        Err(e) => {
            attr::write_status_err(&mut w, e);
            attr::post_op_attr(&mut w, &None);
        }
        Ok(vfs_handle) => match ctx.vfs.path_conf(&vfs_handle).await {
            Ok(conf) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &conf.file_attr);
                w.append_u32(conf.max_link);
                w.append_u32(conf.max_name);
                xdr::write_bool(&mut w, conf.no_trunc);
                xdr::write_bool(&mut w, conf.chown_restricted);
                xdr::write_bool(&mut w, conf.case_insensitive);
                xdr::write_bool(&mut w, conf.case_preserving);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}

/// Procedure 21: COMMIT.
pub async fn commit(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
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
        Ok(vfs_handle) => match ctx.vfs.commit(&vfs_handle, offset, count).await {
            Ok(result) => {
                attr::write_status_ok(&mut w);
                attr::post_op_attr(&mut w, &result.file_attr);
                // Same session verifier WRITE emits (spec §4.8 #21): a
                // client's COMMIT is checked against the core's own
                // constant, not whatever the adapter happened to return.
                w.append_bytes(&ctx.verifier);
            }
            Err(e) => {
                attr::write_status_err(&mut w, e);
                attr::post_op_attr(&mut w, &None);
            }
        },
    }
    Ok(w.into_vec())
}
