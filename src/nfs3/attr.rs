//! NFSv3 attribute mapping and XDR encoding for `fattr3` / `wcc_data`
//! (spec §4.8.2) and the `nfsstat3` error-code table (spec §7).

use crate::buffer::Writer;
use crate::vfs;
use crate::xdr;

/// Converts host "100-nanosecond ticks since 1601" into a `(seconds,
/// nanos)` pair relative to the Unix epoch (spec §4.8.2).
///
/// The offset between the 1601 and 1970 epochs in 100ns ticks is
/// `116444736000000000`. This conversion lives here rather than in the
/// `vfs` adapter boundary so that any adapter measuring ticks natively
/// (rather than `FileTime`) can reuse it, but the adapter trait itself
/// already deals in `vfs::FileTime` — see SPEC_FULL.md's note on this
/// open question.
pub fn filetime_from_windows_ticks(ticks: u64) -> vfs::FileTime {
    const EPOCH_DELTA_TICKS: u64 = 116_444_736_000_000_000;
    let delta = ticks.saturating_sub(EPOCH_DELTA_TICKS);
    vfs::FileTime { seconds: (delta / 10_000_000) as i64, nanos: ((delta % 10_000_000) * 100) as u32 }
}

/// NFSv3 status codes (RFC 1813 2.6), mapped one-to-one from
/// [`vfs::NfsError`].
pub fn nfsstat3(err: vfs::NfsError) -> u32 {
    use vfs::NfsError::*;
    match err {
        Perm => 1,
        NoEnt => 2,
        Io => 5,
        NxIo => 6,
        Access => 13,
        Exist => 17,
        XDev => 18,
        Nodev => 19,
        NotDir => 20,
        IsDir => 21,
        Inval => 22,
        FBig => 27,
        NoSpc => 28,
        RoFs => 30,
        MLink => 31,
        NameTooLong => 63,
        NotEmpty => 66,
        DQuot => 69,
        Stale => 70,
        Remote => 71,
        BadHandle => 10001,
        NotSync => 10002,
        BadCookie => 10003,
        NotSupp => 10004,
        TooSmall => 10005,
        ServerFault => 10006,
        BadType => 10007,
        Jukebox => 10008,
    }
}

pub const STATUS_OK: u32 = 0;

pub fn write_status_ok(w: &mut Writer) {
    w.append_u32(STATUS_OK);
}

pub fn write_status_err(w: &mut Writer, err: vfs::NfsError) {
    w.append_u32(nfsstat3(err));
}

fn ftype3(file_type: vfs::FileType) -> u32 {
    match file_type {
        vfs::FileType::Regular => 1,
        vfs::FileType::Directory => 2,
        vfs::FileType::BlockDevice => 3,
        vfs::FileType::CharacterDevice => 4,
        vfs::FileType::Symlink => 5,
        vfs::FileType::Socket => 6,
        vfs::FileType::Fifo => 7,
    }
}

fn nfstime3(w: &mut Writer, t: vfs::FileTime) {
    w.append_u32(t.seconds as u32);
    w.append_u32(t.nanos);
}

/// Encodes `fattr3` (RFC 1813 2.5).
pub fn fattr3(w: &mut Writer, attr: &vfs::FileAttr) {
    let (major, minor) = attr.device.map(|d| (d.major, d.minor)).unwrap_or((0, 0));
    w.append_u32(ftype3(attr.file_type));
    w.append_u32(attr.mode);
    w.append_u32(attr.nlink);
    w.append_u32(attr.uid);
    w.append_u32(attr.gid);
    w.append_u64(attr.size);
    w.append_u64(attr.used);
    w.append_u32(major);
    w.append_u32(minor);
    w.append_u64(attr.fsid);
    w.append_u64(attr.fileid);
    nfstime3(w, attr.atime);
    nfstime3(w, attr.mtime);
    nfstime3(w, attr.ctime);
}

/// Encodes `post_op_attr`: optional `fattr3`.
pub fn post_op_attr(w: &mut Writer, attr: &Option<vfs::FileAttr>) {
    xdr::write_option(w, attr, |w, a| fattr3(w, a));
}

fn wcc_attr(w: &mut Writer, digest: &vfs::AttrDigest) {
    w.append_u64(digest.size);
    nfstime3(w, digest.mtime);
    nfstime3(w, digest.ctime);
}

/// Encodes `pre_op_attr`: optional `wcc_attr`.
pub fn pre_op_attr(w: &mut Writer, before: &Option<vfs::AttrDigest>) {
    xdr::write_option(w, before, |w, d| wcc_attr(w, d));
}

/// Encodes `wcc_data`: `(pre_op_attr, post_op_attr)`.
pub fn wcc_data(w: &mut Writer, wcc: &vfs::WccData) {
    pre_op_attr(w, &wcc.before);
    post_op_attr(w, &wcc.after);
}

/// Builds the `AttrDigest` "before" snapshot from a freshly fetched
/// attribute set, used right before a mutating operation runs.
pub fn digest_from_attr(attr: &vfs::FileAttr) -> vfs::AttrDigest {
    vfs::AttrDigest { size: attr.size, mtime: attr.mtime, ctime: attr.ctime }
}
