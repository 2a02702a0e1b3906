//! `MOUNT` protocol implementation for NFS version 3 as specified in RFC 1813 section 5.0.
//! <https://datatracker.ietf.org/doc/html/rfc1813#section-5.0>.

pub mod alias;
pub mod cache;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::buffer::{Cursor, Writer};
use crate::nfs3::handle::{FileHandle, WIRE_LEN};
use crate::rpc::router::{FnProcedure, Router};
use crate::rpc::AUTH_NONE;
use crate::vfs::Vfs;
use crate::xdr;
use alias::AliasResolver;
use cache::{MountCache, MountError};

/// RPC program number (RFC 1813 §5.0).
pub const PROGRAM: u32 = 100005;
pub const VERSION: u32 = 3;

/// Maximum bytes in a path name (`MNTPATHLEN`).
pub const MOUNT_DIRPATH_LEN: usize = 1024;

pub mod procedure {
    pub const NULL: u32 = 0;
    pub const MNT: u32 = 1;
    pub const DUMP: u32 = 2;
    pub const UMNT: u32 = 3;
    pub const UMNTALL: u32 = 4;
    pub const EXPORT: u32 = 5;
}

const MNT_OK: u32 = 0;

/// `mountstat3` (RFC 1813 §5.1.1). Only the subset this server ever returns.
fn mountstat3(err: &MountError) -> u32 {
    match err {
        MountError::NotFound => 2,   // MNT3ERR_NOENT
        MountError::OpenFailed => 2, // MNT3ERR_NOENT
    }
}

async fn null(_sender: SocketAddr, _params: &[u8]) -> crate::rpc::router::ProcOutcome {
    Ok(Vec::new())
}

async fn mnt(
    sender: SocketAddr,
    params: &[u8],
    cache: &MountCache,
    aliases: &AliasResolver,
    vfs: &dyn Vfs,
) -> crate::rpc::router::ProcOutcome {
    let mut cur = Cursor::new(params);
    let dirpath = xdr::read_string(&mut cur, MOUNT_DIRPATH_LEN)?;

    let mut w = Writer::new();
    match cache.mnt(&sender.to_string(), &dirpath, aliases, vfs).await {
        Ok(mounted) => {
            w.append_u32(MNT_OK);
            xdr::write_opaque(&mut w, &mounted.handle.to_wire(), WIRE_LEN)?;
            xdr::write_list(&mut w, &[AUTH_NONE], |w, v| w.append_u32(*v));
        }
        Err(e) => w.append_u32(mountstat3(&e)),
    }
    Ok(w.into_vec())
}

async fn umnt(
    sender: SocketAddr,
    params: &[u8],
    cache: &MountCache,
) -> crate::rpc::router::ProcOutcome {
    let mut cur = Cursor::new(params);
    let dirpath = xdr::read_string(&mut cur, MOUNT_DIRPATH_LEN)?;
    cache.umnt(&sender.to_string(), &dirpath);
    Ok(Vec::new())
}

async fn umnt_all(
    sender: SocketAddr,
    _params: &[u8],
    cache: &MountCache,
) -> crate::rpc::router::ProcOutcome {
    cache.umnt_all(&sender.to_string());
    Ok(Vec::new())
}

/// DUMP and EXPORT are both stubbed to an empty list — this server does
/// not track exports separately from the alias table (spec §6).
async fn empty_list(_sender: SocketAddr, _params: &[u8]) -> crate::rpc::router::ProcOutcome {
    let mut w = Writer::new();
    xdr::write_bool(&mut w, false);
    Ok(w.into_vec())
}

/// Registers NULL/MNT/UMNT/UMNTALL/DUMP/EXPORT against `router`.
pub fn register(
    router: &mut Router,
    cache: Arc<MountCache>,
    aliases: Arc<AliasResolver>,
    vfs: Arc<dyn Vfs>,
) {
    router.register(
        PROGRAM,
        VERSION,
        procedure::NULL,
        Arc::new(FnProcedure(|sender, params| async move { null(sender, &params).await })),
    );

    {
        let cache = cache.clone();
        let aliases = aliases.clone();
        let vfs = vfs.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::MNT,
            Arc::new(FnProcedure(move |sender, params| {
                let cache = cache.clone();
                let aliases = aliases.clone();
                let vfs = vfs.clone();
                async move { mnt(sender, &params, &cache, &aliases, vfs.as_ref()).await }
            })),
        );
    }

    {
        let cache = cache.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::UMNT,
            Arc::new(FnProcedure(move |sender, params| {
                let cache = cache.clone();
                async move { umnt(sender, &params, &cache).await }
            })),
        );
    }

    {
        let cache = cache.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::UMNTALL,
            Arc::new(FnProcedure(move |sender, params| {
                let cache = cache.clone();
                async move { umnt_all(sender, &params, &cache).await }
            })),
        );
    }

    router.register(
        PROGRAM,
        VERSION,
        procedure::DUMP,
        Arc::new(FnProcedure(|sender, params| async move { empty_list(sender, &params).await })),
    );
    router.register(
        PROGRAM,
        VERSION,
        procedure::EXPORT,
        Arc::new(FnProcedure(|sender, params| async move { empty_list(sender, &params).await })),
    );
}
