//! NFS version 3 program (RFC 1813): 21 procedures over a file-handle-based
//! filesystem, dispatched through [`crate::rpc::router::Router`] exactly
//! like the MOUNT program in [`crate::mount`].
//!
//! Every procedure starts with the same handle-validation sequence (spec
//! §4.8): decode the wire handle, confirm its `mount_id` is known to the
//! [`MountCache`] and its `volume_serial` still matches, then hand the
//! adapter-facing handle to [`crate::vfs::Vfs`]. `proc::*` modules hold one
//! file per procedure group; this module only owns the shared [`Context`]
//! and the registration table.

pub mod attr;
pub mod handle;
mod proc;
#[cfg(test)]
pub(crate) mod tests_support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::buffer::{Cursor, Writer};
use crate::mount::cache::MountCache;
use crate::rpc::router::{FnProcedure, ProcOutcome, Router};
use crate::vfs::{self, NfsError, Vfs};
use crate::xdr;

pub const PROGRAM: u32 = 100003;
pub const VERSION: u32 = 3;

pub const FHSIZE: usize = handle::WIRE_LEN;
pub const COOKIEVERF_SIZE: usize = 8;
pub const CREATEVERF_SIZE: usize = 8;
pub const WRITEVERF_SIZE: usize = 8;
/// `MAXDATA`: the largest READ/WRITE payload this core will decode or
/// allocate for a single call (spec §4.8 FSINFO advertises smaller prefs,
/// but a well-behaved client may still send up to this much).
pub const MAX_DATA_LEN: usize = 1 << 20;

pub mod procedure {
    pub const NULL: u32 = 0;
    pub const GETATTR: u32 = 1;
    pub const SETATTR: u32 = 2;
    pub const LOOKUP: u32 = 3;
    pub const ACCESS: u32 = 4;
    pub const READLINK: u32 = 5;
    pub const READ: u32 = 6;
    pub const WRITE: u32 = 7;
    pub const CREATE: u32 = 8;
    pub const MKDIR: u32 = 9;
    pub const SYMLINK: u32 = 10;
    pub const MKNOD: u32 = 11;
    pub const REMOVE: u32 = 12;
    pub const RMDIR: u32 = 13;
    pub const RENAME: u32 = 14;
    pub const LINK: u32 = 15;
    pub const READDIR: u32 = 16;
    pub const READDIRPLUS: u32 = 17;
    pub const FSSTAT: u32 = 18;
    pub const FSINFO: u32 = 19;
    pub const PATHCONF: u32 = 20;
    pub const COMMIT: u32 = 21;
}

/// Shared state every procedure callback closes over.
pub struct Context {
    pub cache: Arc<MountCache>,
    pub vfs: Arc<dyn Vfs>,
    /// The write/commit verifier for this server run (spec §4.8 #21:
    /// "server verifier (constant per session)"). Changes across restarts
    /// so a client's COMMIT against a stale verifier is detected.
    pub verifier: [u8; WRITEVERF_SIZE],
}

impl Context {
    pub fn new(cache: Arc<MountCache>, vfs: Arc<dyn Vfs>) -> Self {
        Self { cache, vfs, verifier: session_verifier() }
    }
}

fn session_verifier() -> [u8; 8] {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let pid = std::process::id() as u128;
    ((nanos ^ (pid << 64)) as u64).to_be_bytes()
}

/// Decodes the leading `nfs_fh3` opaque argument common to every procedure.
pub(crate) fn read_handle(cur: &mut Cursor) -> xdr::Result<handle::FileHandle> {
    let (bytes, _) = xdr::read_opaque(cur, FHSIZE)?;
    handle::FileHandle::from_wire(&bytes).ok_or(xdr::Invalid)
}

pub(crate) fn write_handle(w: &mut Writer, h: handle::FileHandle) {
    let _ = xdr::write_opaque(w, &h.to_wire(), FHSIZE);
}

/// Writes `post_op_fh3`: an optional handle, used by CREATE/MKDIR/SYMLINK/
/// MKNOD/LINK results when the adapter's node id doesn't fit `file_id`.
pub(crate) fn write_post_op_handle(w: &mut Writer, h: Option<handle::FileHandle>) {
    xdr::write_option(w, &h, |w, h| write_handle(w, *h));
}

/// Decodes a `filename3` (RFC 1813 2.5): a string bounded by `MAX_NAME_LEN`.
pub(crate) fn read_name(cur: &mut Cursor) -> xdr::Result<vfs::FileName> {
    xdr::read_string(cur, vfs::MAX_NAME_LEN).map(vfs::FileName)
}

/// Decodes an `nfspath3` (RFC 1813 2.5): a string bounded by `MAX_PATH_LEN`.
pub(crate) fn read_path(cur: &mut Cursor) -> xdr::Result<String> {
    xdr::read_string(cur, vfs::MAX_PATH_LEN)
}

/// Decodes `diropargs3`: a directory handle plus a child name.
pub(crate) fn read_dirop(cur: &mut Cursor) -> xdr::Result<(handle::FileHandle, vfs::FileName)> {
    let dir = read_handle(cur)?;
    let name = read_name(cur)?;
    Ok((dir, name))
}

fn read_set_time(cur: &mut Cursor) -> xdr::Result<vfs::SetTime> {
    match xdr::read_u32(cur)? {
        0 => Ok(vfs::SetTime::DontChange),
        1 => Ok(vfs::SetTime::ServerCurrent),
        2 => {
            let seconds = xdr::read_u32(cur)? as i64;
            let nanos = xdr::read_u32(cur)?;
            Ok(vfs::SetTime::ClientProvided(vfs::FileTime { seconds, nanos }))
        }
        _ => Err(xdr::Invalid),
    }
}

/// Decodes `sattr3` (RFC 1813 3.3.2): four optional scalars followed by the
/// two `set_atime`/`set_mtime` discriminated unions.
pub(crate) fn read_sattr(cur: &mut Cursor) -> xdr::Result<vfs::SetAttr> {
    let mode = xdr::read_option(cur, xdr::read_u32)?;
    let uid = xdr::read_option(cur, xdr::read_u32)?;
    let gid = xdr::read_option(cur, xdr::read_u32)?;
    let size = xdr::read_option(cur, xdr::read_u64)?;
    let atime = read_set_time(cur)?;
    let mtime = read_set_time(cur)?;
    Ok(vfs::SetAttr { mode, uid, gid, size, atime, mtime })
}

/// Decodes `sattrguard3` (RFC 1813 3.3.2): an optional `ctime`, used to
/// reject a SETATTR racing a concurrent change to the same object.
pub(crate) fn read_setattr_guard(cur: &mut Cursor) -> xdr::Result<vfs::SetAttrGuard> {
    let guard = xdr::read_option(cur, |cur| {
        let seconds = xdr::read_u32(cur)? as i64;
        let nanos = xdr::read_u32(cur)?;
        Ok(vfs::FileTime { seconds, nanos })
    })?;
    Ok(match guard {
        Some(ctime) => vfs::SetAttrGuard::Check { ctime },
        None => vfs::SetAttrGuard::None,
    })
}

/// Validates a decoded handle against the mount cache (spec §4.8, I4):
/// unknown `mount_id` or a changed `volume_serial` both report
/// `ERR_BADHANDLE` before the adapter is ever consulted.
pub(crate) fn validate(ctx: &Context, h: handle::FileHandle) -> Result<crate::vfs::FileHandle, NfsError> {
    if ctx.cache.validate(h.mount_id, h.volume_serial) {
        Ok(h.vfs_handle())
    } else {
        Err(NfsError::BadHandle)
    }
}

/// Registers all 22 NFSv3 procedure callbacks (0 through 21) against
/// `router`.
pub fn register(router: &mut Router, ctx: Arc<Context>) {
    macro_rules! register_proc {
        ($proc_const:expr, $func:path) => {{
            let ctx = ctx.clone();
            router.register(
                PROGRAM,
                VERSION,
                $proc_const,
                Arc::new(FnProcedure(move |sender, params| {
                    let ctx = ctx.clone();
                    async move { $func(sender, &params, ctx.as_ref()).await }
                })),
            );
        }};
    }

    router.register(
        PROGRAM,
        VERSION,
        procedure::NULL,
        Arc::new(FnProcedure(|_sender, _params| async move { Ok(Vec::new()) })),
    );

    register_proc!(procedure::GETATTR, proc::get_attr::call);
    register_proc!(procedure::SETATTR, proc::set_attr::call);
    register_proc!(procedure::LOOKUP, proc::lookup::call);
    register_proc!(procedure::ACCESS, proc::access::call);
    register_proc!(procedure::READLINK, proc::read_link::call);
    register_proc!(procedure::READ, proc::read::call);
    register_proc!(procedure::WRITE, proc::write::call);
    register_proc!(procedure::CREATE, proc::create::create);
    register_proc!(procedure::MKDIR, proc::create::mkdir);
    register_proc!(procedure::SYMLINK, proc::create::symlink);
    register_proc!(procedure::MKNOD, proc::create::mknod);
    register_proc!(procedure::REMOVE, proc::remove::remove);
    register_proc!(procedure::RMDIR, proc::remove::rmdir);
    register_proc!(procedure::RENAME, proc::rename::call);
    register_proc!(procedure::LINK, proc::link::call);
    register_proc!(procedure::READDIR, proc::read_dir::call);
    register_proc!(procedure::READDIRPLUS, proc::read_dir_plus::call);
    register_proc!(procedure::FSSTAT, proc::fs::fsstat);
    register_proc!(procedure::FSINFO, proc::fs::fsinfo);
    register_proc!(procedure::PATHCONF, proc::fs::pathconf);
    register_proc!(procedure::COMMIT, proc::fs::commit);
}

pub(crate) type Outcome = ProcOutcome;
