//! Fuzzes the full decode -> validate -> dispatch -> encode pipeline for
//! the NFSv3 program registered on a [`Router`].
//!
//! The backing [`Vfs`] here always reports `NotSupp`; the target's job is
//! to confirm that no sequence of NFS3 procedure/argument bytes makes any
//! procedure decoder or the router itself panic, not to exercise real
//! filesystem behavior (covered by the `ShadowFS` integration tests).

#![no_main]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use libfuzzer_sys::fuzz_target;

use nfs_mamont::mount::cache::MountCache;
use nfs_mamont::nfs3;
use nfs_mamont::rpc::router::Router;
use nfs_mamont::vfs::{
    AccessMask, AccessResult, CommitResult, CreateMode, CreatedNode, DirectoryCookie,
    CookieVerifier, FileHandle, FileName, FsInfo, FsPath, FsStat, LinkResult, LookupResult,
    NfsError, OpenedMount, PathConfig, ReadDirPlusResult, ReadDirResult, ReadResult,
    RemovalResult, RenameResult, SetAttr, SetAttrGuard, SpecialNode, SymlinkTarget, Vfs,
    VfsResult, WccData, WriteMode, WriteResult,
};
use nfs_mamont::xdr;
use nfs_mamont::buffer::Writer;

struct NotSuppVfs;

#[async_trait]
impl Vfs for NotSuppVfs {
    async fn null(&self) -> VfsResult<()> {
        Ok(())
    }
    async fn open_path(&self, _: &FsPath) -> VfsResult<OpenedMount> {
        Err(NfsError::NotSupp)
    }
    async fn get_attr(&self, _: &FileHandle) -> VfsResult<nfs_mamont::vfs::FileAttr> {
        Err(NfsError::NotSupp)
    }
    async fn set_attr(&self, _: &FileHandle, _: SetAttr, _: SetAttrGuard) -> VfsResult<WccData> {
        Err(NfsError::NotSupp)
    }
    async fn lookup(&self, _: &FileHandle, _: &FileName) -> VfsResult<LookupResult> {
        Err(NfsError::NotSupp)
    }
    async fn access(&self, _: &FileHandle, _: AccessMask) -> VfsResult<AccessResult> {
        Err(NfsError::NotSupp)
    }
    async fn read_link(
        &self,
        _: &FileHandle,
    ) -> VfsResult<(SymlinkTarget, Option<nfs_mamont::vfs::FileAttr>)> {
        Err(NfsError::NotSupp)
    }
    async fn read(&self, _: &FileHandle, _: u64, _: u32) -> VfsResult<ReadResult> {
        Err(NfsError::NotSupp)
    }
    async fn write(
        &self,
        _: &FileHandle,
        _: u64,
        _: &[u8],
        _: WriteMode,
    ) -> VfsResult<WriteResult> {
        Err(NfsError::NotSupp)
    }
    async fn create(&self, _: &FileHandle, _: &FileName, _: CreateMode) -> VfsResult<CreatedNode> {
        Err(NfsError::NotSupp)
    }
    async fn make_dir(&self, _: &FileHandle, _: &FileName, _: SetAttr) -> VfsResult<CreatedNode> {
        Err(NfsError::NotSupp)
    }
    async fn make_symlink(
        &self,
        _: &FileHandle,
        _: &FileName,
        _: &SymlinkTarget,
        _: SetAttr,
    ) -> VfsResult<CreatedNode> {
        Err(NfsError::NotSupp)
    }
    async fn make_node(
        &self,
        _: &FileHandle,
        _: &FileName,
        _: SpecialNode,
    ) -> VfsResult<CreatedNode> {
        Err(NfsError::NotSupp)
    }
    async fn remove(&self, _: &FileHandle, _: &FileName) -> VfsResult<RemovalResult> {
        Err(NfsError::NotSupp)
    }
    async fn remove_dir(&self, _: &FileHandle, _: &FileName) -> VfsResult<RemovalResult> {
        Err(NfsError::NotSupp)
    }
    async fn rename(
        &self,
        _: &FileHandle,
        _: &FileName,
        _: &FileHandle,
        _: &FileName,
    ) -> VfsResult<RenameResult> {
        Err(NfsError::NotSupp)
    }
    async fn link(&self, _: &FileHandle, _: &FileHandle, _: &FileName) -> VfsResult<LinkResult> {
        Err(NfsError::NotSupp)
    }
    async fn read_dir(
        &self,
        _: &FileHandle,
        _: DirectoryCookie,
        _: CookieVerifier,
        _: u32,
    ) -> VfsResult<ReadDirResult> {
        Err(NfsError::NotSupp)
    }
    async fn read_dir_plus(
        &self,
        _: &FileHandle,
        _: DirectoryCookie,
        _: CookieVerifier,
        _: u32,
        _: u32,
    ) -> VfsResult<ReadDirPlusResult> {
        Err(NfsError::NotSupp)
    }
    async fn fs_stat(&self, _: &FileHandle) -> VfsResult<FsStat> {
        Err(NfsError::NotSupp)
    }
    async fn fs_info(&self, _: &FileHandle) -> VfsResult<FsInfo> {
        Err(NfsError::NotSupp)
    }
    async fn path_conf(&self, _: &FileHandle) -> VfsResult<PathConfig> {
        Err(NfsError::NotSupp)
    }
    async fn commit(&self, _: &FileHandle, _: u64, _: u32) -> VfsResult<CommitResult> {
        Err(NfsError::NotSupp)
    }
}

fn encode_call(procedure: u32, params: &[u8]) -> Vec<u8> {
    let mut w = Writer::new();
    w.append_u32(1); // xid
    w.append_u32(0); // CALL
    w.append_u32(2); // rpc version
    w.append_u32(nfs3::PROGRAM);
    w.append_u32(nfs3::VERSION);
    w.append_u32(procedure);
    let _ = xdr::write_opaque(&mut w, &[], 400); // cred: AUTH_NONE
    let _ = xdr::write_opaque(&mut w, &[], 400); // verf: AUTH_NONE
    w.append_bytes(params);
    w.into_vec()
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let procedure = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) % 22;
    let params = &data[4..];

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    rt.block_on(async {
        let cache = Arc::new(MountCache::new());
        let ctx = Arc::new(nfs3::Context::new(cache, Arc::new(NotSuppVfs)));
        let mut router = Router::new();
        nfs3::register(&mut router, ctx);

        let bytes = encode_call(procedure, params);
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let _ = router.dispatch(addr, &bytes).await;
    });
});
