//! RENAME (RFC 1813 §3.3.14) — procedure 14.

use std::net::SocketAddr;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::{attr, read_dirop, validate, Context, Outcome};
use crate::vfs::{NfsError, WccData};

/// Procedure 14: RENAME. Cross-mount rename is permitted, but only between
/// handles that address the same `volume_serial` — two exports of the same
/// physical volume may rename into one another, two different volumes may
/// not (spec §4.8 row 14); a mismatch is `ERR_XDEV` rather than a `Vfs` call.
pub async fn call(_sender: SocketAddr, params: &[u8], ctx: &Context) -> Outcome {
    let mut cur = Cursor::new(params);
    let (from_fh, from_name) = read_dirop(&mut cur)?;
    let (to_fh, to_name) = read_dirop(&mut cur)?;

    let mut w = Writer::new();
    let empty_wcc = || WccData { before: None, after: None };
    match (validate(ctx, from_fh), validate(ctx, to_fh)) {
        (Ok(from_vfs), Ok(to_vfs)) if from_fh.volume_serial == to_fh.volume_serial => {
            match ctx.vfs.rename(&from_vfs, &from_name, &to_vfs, &to_name).await {
                Ok(result) => {
                    attr::write_status_ok(&mut w);
                    attr::wcc_data(&mut w, &result.from_directory_wcc);
                    attr::wcc_data(&mut w, &result.to_directory_wcc);
                }
                Err(e) => {
                    attr::write_status_err(&mut w, e);
                    attr::wcc_data(&mut w, &empty_wcc());
                    attr::wcc_data(&mut w, &empty_wcc());
                }
            }
        }
        (Ok(_), Ok(_)) => {
            attr::write_status_err(&mut w, NfsError::XDev);
            attr::wcc_data(&mut w, &empty_wcc());
            attr::wcc_data(&mut w, &empty_wcc());
        }
        (Err(e), _) | (_, Err(e)) => {
            attr::write_status_err(&mut w, e);
            attr::wcc_data(&mut w, &empty_wcc());
            attr::wcc_data(&mut w, &empty_wcc());
        }
    }
    Ok(w.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs3::handle::FileHandle;
    use crate::nfs3::tests_support::*;
    use crate::vfs::{CreateMode, FileName, SetAttr, SetTime};

    fn rename_args(from: FileHandle, from_name: &str, to: FileHandle, to_name: &str) -> Vec<u8> {
        let mut w = Writer::new();
        crate::nfs3::write_handle(&mut w, from);
        crate::xdr::write_string(&mut w, from_name, crate::vfs::MAX_NAME_LEN).unwrap();
        crate::nfs3::write_handle(&mut w, to);
        crate::xdr::write_string(&mut w, to_name, crate::vfs::MAX_NAME_LEN).unwrap();
        w.into_vec()
    }

    #[tokio::test]
    async fn renames_existing_file() {
        let ctx = test_context(test_vfs());
        let root = mount_root(&ctx).await;
        let root_vfs = validate(&ctx, root).unwrap();
        let no_op_attr = SetAttr {
            mode: None,
            uid: None,
            gid: None,
            size: None,
            atime: SetTime::DontChange,
            mtime: SetTime::DontChange,
        };
        ctx.vfs
            .create(&root_vfs, &FileName("a.txt".into()), CreateMode::Unchecked { attr: no_op_attr })
            .await
            .unwrap();
        let params = rename_args(root, "a.txt", root, "b.txt");
        let reply = call(addr(), &params, &ctx).await.unwrap();
        assert_eq!(&reply[0..4], &0u32.to_be_bytes());
    }

    #[tokio::test]
    async fn missing_source_reports_no_ent() {
        let ctx = test_context(test_vfs());
        let root = mount_root(&ctx).await;
        let params = rename_args(root, "nope", root, "b.txt");
        let reply = call(addr(), &params, &ctx).await.unwrap();
        assert_eq!(&reply[0..4], &attr::nfsstat3(crate::vfs::NfsError::NoEnt).to_be_bytes());
    }

    #[tokio::test]
    async fn cross_volume_rename_reports_xdev() {
        let ctx = test_context(test_vfs());
        let root = mount_root(&ctx).await;
        let alt = mount_alt_volume(&ctx).await;
        let params = rename_args(root, "a.txt", alt, "b.txt");
        let reply = call(addr(), &params, &ctx).await.unwrap();
        assert_eq!(&reply[0..4], &attr::nfsstat3(NfsError::XDev).to_be_bytes());
    }
}
