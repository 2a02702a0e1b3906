//! CREATE, MKDIR, SYMLINK, MKNOD (RFC 1813 §3.3.8-3.3.11) — procedures 8-11.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{
    attr, handle, read_dirop, read_name, read_path, read_sattr, validate, write_post_op_handle,
    Context, Outcome, CREATEVERF_SIZE,
};
use crate::vfs::{CreateMode, CreatedNode, DeviceId, NfsError, SpecialNode, WccData};
use crate::xdr;

fn write_created(w: &mut Writer, mount_id: u64, volume_serial: u64, node: CreatedNode) {
    attr::write_status_ok(w);
    let fh = handle::FileHandle::from_vfs(mount_id, volume_serial, &node.handle);
    write_post_op_handle(w, fh);
    attr::post_op_attr(w, &Some(node.attr));
    attr::wcc_data(w, &node.directory_wcc);
}

fn write_create_failure(w: &mut Writer, err: crate::vfs::NfsError) {
    attr::write_status_err(w, err);
    attr::wcc_data(w, &WccData { before: None, after: None });
}

fn read_createverf(cur: &mut Cursor) -> xdr::Result<[u8; CREATEVERF_SIZE]> {
    xdr::read_array::<CREATEVERF_SIZE>(cur)
}

fn read_create_how(cur: &mut Cursor) -> xdr::Result<CreateMode> {
    match xdr::read_u32(cur)? {
        0 => Ok(CreateMode::Unchecked { attr: read_sattr(cur)? }),
        1 => Ok(CreateMode::Guarded { attr: read_sattr(cur)?, verifier: read_createverf(cur)? }),
        2 => Ok(CreateMode::Exclusive { verifier: read_createverf(cur)? }),
        _ => Err(xdr::Invalid),
    }
}

/// Procedure 8: CREATE.
pub async fn create(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;
    let how = read_create_how(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => write_create_failure(&mut w, e),
        Ok(vfs_dir) => match ctx.vfs.create(&vfs_dir, &name, how).await {
            Ok(node) => write_created(&mut w, dir_fh.mount_id, dir_fh.volume_serial, node),
            Err(e) => write_create_failure(&mut w, e),
        },
    }
    Ok(w.into_vec())
}

/// Procedure 9: MKDIR.
pub async fn mkdir(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;
    let new_attr = read_sattr(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => write_create_failure(&mut w, e),
        Ok(vfs_dir) => match ctx.vfs.make_dir(&vfs_dir, &name, new_attr).await {
            Ok(node) => write_created(&mut w, dir_fh.mount_id, dir_fh.volume_serial, node),
            Err(e) => write_create_failure(&mut w, e),
        },
    }
    Ok(w.into_vec())
}

/// Procedure 10: SYMLINK. Symbolic-link creation is out of scope (spec §1
/// Non-goals); the arguments are still decoded in full so a malformed call
/// gets `GARBAGE_ARGS` rather than a false `NOTSUPP`, matching how MKNOD
/// (procedure 11) is handled below.
pub async fn symlink(_sender: SocketAddr, params: &[u8], _ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, _name) = read_dirop(&mut cur)?;
    let _new_attr = read_sattr(&mut cur)?;
    let _target = read_path(&mut cur)?;
    let _ = dir_fh;

    let mut w = Writer::new();
    write_create_failure(&mut w, NfsError::NotSupp);
    Ok(w.into_vec())
}

fn read_device(cur: &mut Cursor) -> xdr::Result<DeviceId> {
    Ok(DeviceId { major: xdr::read_u32(cur)?, minor: xdr::read_u32(cur)? })
}

fn read_special_node(cur: &mut Cursor) -> xdr::Result<SpecialNode> {
    match xdr::read_u32(cur)? {
        3 => Ok(SpecialNode::Block { attr: read_sattr(cur)?, device: read_device(cur)? }),
        4 => Ok(SpecialNode::Character { attr: read_sattr(cur)?, device: read_device(cur)? }),
        6 => Ok(SpecialNode::Socket { attr: read_sattr(cur)? }),
        7 => Ok(SpecialNode::Fifo { attr: read_sattr(cur)? }),
        _ => Err(xdr::Invalid),
    }
}

/// Procedure 11: MKNOD.
pub async fn mknod(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (dir_fh, name) = read_dirop(&mut cur)?;
    let node = read_special_node(&mut cur)?;

    let mut w = Writer::new();
    match validate(ctx, dir_fh) {
        Err(e) => write_create_failure(&mut w, e),
        Ok(vfs_dir) => match ctx.vfs.make_node(&vfs_dir, &name, node).await {
            Ok(created) => write_created(&mut w, dir_fh.mount_id, dir_fh.volume_serial, created),
            Err(e) => write_create_failure(&mut w, e),
        },
    }
    Ok(w.into_vec())
}
