//! Shared scaffolding for `nfs3::proc::*` unit tests: a minimal in-memory
//! [`Vfs`] plus the handle/context helpers every procedure test needs.
//!
//! This is deliberately not the `ShadowFS` demo adapter (that lives outside
//! the library crate, under `demos/`) — these tests only need a `Vfs` that
//! behaves plausibly, not one backed by a real filesystem.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::buffer::Writer;
use crate::mount::alias::AliasResolver;
use crate::mount::cache::MountCache;
use crate::nfs3::handle::FileHandle;
use crate::nfs3::{write_handle, Context};
use crate::vfs::*;

const ROOT_ID: u128 = 1;

#[derive(Clone)]
enum Kind {
    File(Vec<u8>),
    Dir(BTreeMap<String, u128>),
    Symlink(String),
}

#[derive(Clone)]
struct Node {
    kind: Kind,
    mode: u32,
    parent: u128,
}

impl Node {
    fn attr(&self, fileid: u128) -> FileAttr {
        let (file_type, size, nlink) = match &self.kind {
            Kind::File(data) => (FileType::Regular, data.len() as u64, 1),
            Kind::Dir(children) => (FileType::Directory, 0, children.len() as u32 + 2),
            Kind::Symlink(target) => (FileType::Symlink, target.len() as u64, 1),
        };
        FileAttr {
            file_type,
            mode: self.mode,
            nlink,
            uid: 0,
            gid: 0,
            size,
            used: size,
            device: None,
            fsid: 1,
            fileid: fileid as u64,
            atime: FileTime { seconds: 0, nanos: 0 },
            mtime: FileTime { seconds: 0, nanos: 0 },
            ctime: FileTime { seconds: 0, nanos: 0 },
        }
    }
}

/// Minimal in-memory filesystem exercising the full [`Vfs`] surface.
pub(crate) struct InMemoryVfs {
    nodes: Mutex<BTreeMap<u128, Node>>,
    next_id: AtomicU64,
    /// Host path -> (root node id, volume serial), populated lazily by
    /// `open_path` so a second distinct mount path mints a second root with
    /// its own `volume_serial`, exercising cross-volume handle checks.
    roots: Mutex<BTreeMap<String, (u128, u64)>>,
    next_volume_serial: AtomicU64,
}

impl InMemoryVfs {
    pub(crate) fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_ID, Node { kind: Kind::Dir(BTreeMap::new()), mode: 0o755, parent: ROOT_ID });
        let mut roots = BTreeMap::new();
        roots.insert("/root".to_string(), (ROOT_ID, 1));
        Self {
            nodes: Mutex::new(nodes),
            next_id: AtomicU64::new(2),
            roots: Mutex::new(roots),
            next_volume_serial: AtomicU64::new(2),
        }
    }

    fn decode(handle: &crate::vfs::FileHandle) -> VfsResult<u128> {
        if handle.0.len() != 16 {
            return Err(NfsError::BadHandle);
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&handle.0);
        Ok(u128::from_be_bytes(buf))
    }

    fn encode(id: u128) -> crate::vfs::FileHandle {
        crate::vfs::FileHandle(id.to_be_bytes().to_vec())
    }

    fn alloc(&self) -> u128 {
        self.next_id.fetch_add(1, Ordering::Relaxed) as u128
    }

    fn dir_children(node: &Node) -> VfsResult<&BTreeMap<String, u128>> {
        match &node.kind {
            Kind::Dir(children) => Ok(children),
            _ => Err(NfsError::NotDir),
        }
    }
}

#[async_trait]
impl Vfs for InMemoryVfs {
    async fn null(&self) -> VfsResult<()> {
        Ok(())
    }

    async fn open_path(&self, path: &FsPath) -> VfsResult<OpenedMount> {
        let mut roots = self.roots.lock().unwrap();
        let (root_id, volume_serial) = match roots.get(&path.0) {
            Some(&entry) => entry,
            None => {
                let root_id = self.alloc();
                let volume_serial = self.next_volume_serial.fetch_add(1, Ordering::Relaxed);
                let mut nodes = self.nodes.lock().unwrap();
                nodes.insert(root_id, Node { kind: Kind::Dir(BTreeMap::new()), mode: 0o755, parent: root_id });
                roots.insert(path.0.clone(), (root_id, volume_serial));
                (root_id, volume_serial)
            }
        };
        let nodes = self.nodes.lock().unwrap();
        let root = &nodes[&root_id];
        Ok(OpenedMount {
            handle: Self::encode(root_id),
            canonical_path: path.0.clone(),
            volume_serial,
            attr: root.attr(root_id),
        })
    }

    async fn get_attr(&self, handle: &crate::vfs::FileHandle) -> VfsResult<FileAttr> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        Ok(node.attr(id))
    }

    async fn set_attr(
        &self,
        handle: &crate::vfs::FileHandle,
        attr: SetAttr,
        guard: SetAttrGuard,
    ) -> VfsResult<WccData> {
        let id = Self::decode(handle)?;
        let mut nodes = self.nodes.lock().unwrap();
        let before = nodes.get(&id).ok_or(NfsError::Stale)?.attr(id);
        if let SetAttrGuard::Check { ctime } = guard {
            if before.ctime != ctime {
                return Err(NfsError::NotSync);
            }
        }
        let node = nodes.get_mut(&id).ok_or(NfsError::Stale)?;
        if let Some(mode) = attr.mode {
            node.mode = mode;
        }
        if let Some(size) = attr.size {
            if let Kind::File(data) = &mut node.kind {
                data.resize(size as usize, 0);
            }
        }
        let after = node.attr(id);
        Ok(WccData {
            before: Some(AttrDigest { size: before.size, mtime: before.mtime, ctime: before.ctime }),
            after: Some(after),
        })
    }

    async fn lookup(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
    ) -> VfsResult<LookupResult> {
        let parent_id = Self::decode(parent)?;
        let nodes = self.nodes.lock().unwrap();
        let parent_node = nodes.get(&parent_id).ok_or(NfsError::Stale)?;
        let children = Self::dir_children(parent_node)?;
        let child_id = *children.get(&name.0).ok_or(NfsError::NoEnt)?;
        let child = &nodes[&child_id];
        Ok(LookupResult {
            handle: Self::encode(child_id),
            object_attr: child.attr(child_id),
            directory_attr: Some(parent_node.attr(parent_id)),
        })
    }

    async fn access(
        &self,
        handle: &crate::vfs::FileHandle,
        mask: AccessMask,
    ) -> VfsResult<AccessResult> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        Ok(AccessResult { granted: mask, file_attr: Some(node.attr(id)) })
    }

    async fn read_link(
        &self,
        handle: &crate::vfs::FileHandle,
    ) -> VfsResult<(SymlinkTarget, Option<FileAttr>)> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        match &node.kind {
            Kind::Symlink(target) => Ok((SymlinkTarget(target.clone()), Some(node.attr(id)))),
            _ => Err(NfsError::Inval),
        }
    }

    async fn read(
        &self,
        handle: &crate::vfs::FileHandle,
        offset: u64,
        count: u32,
    ) -> VfsResult<ReadResult> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        let data = match &node.kind {
            Kind::File(data) => data,
            _ => return Err(NfsError::Inval),
        };
        let offset = offset as usize;
        let end = std::cmp::min(data.len(), offset.saturating_add(count as usize));
        let slice = if offset >= data.len() { &[][..] } else { &data[offset..end] };
        let eof = offset.saturating_add(slice.len()) >= data.len();
        Ok(ReadResult { data: slice.to_vec(), eof, file_attr: Some(node.attr(id)) })
    }

    async fn write(
        &self,
        handle: &crate::vfs::FileHandle,
        offset: u64,
        data: &[u8],
        mode: WriteMode,
    ) -> VfsResult<WriteResult> {
        let id = Self::decode(handle)?;
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(&id).ok_or(NfsError::Stale)?;
        let file = match &mut node.kind {
            Kind::File(file) => file,
            _ => return Err(NfsError::Inval),
        };
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file.splice(offset as usize..end, data.iter().copied());
        let attr = node.attr(id);
        Ok(WriteResult {
            count: data.len() as u32,
            committed: mode,
            verifier: StableVerifier([0; 8]),
            file_attr: Some(attr),
        })
    }

    async fn create(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
        mode: CreateMode,
    ) -> VfsResult<CreatedNode> {
        let parent_id = Self::decode(parent)?;
        let new_id = self.alloc();
        let mut nodes = self.nodes.lock().unwrap();
        {
            let parent_node = nodes.get(&parent_id).ok_or(NfsError::Stale)?;
            let children = Self::dir_children(parent_node)?;
            if children.contains_key(&name.0) && matches!(mode, CreateMode::Exclusive { .. }) {
                return Err(NfsError::Exist);
            }
        }
        let file_mode = match &mode {
            CreateMode::Unchecked { attr } | CreateMode::Guarded { attr, .. } => {
                attr.mode.unwrap_or(0o644)
            }
            CreateMode::Exclusive { .. } => 0o644,
        };
        nodes.insert(new_id, Node { kind: Kind::File(Vec::new()), mode: file_mode, parent: parent_id });
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.insert(name.0.clone(), new_id);
        }
        let attr = nodes[&new_id].attr(new_id);
        Ok(CreatedNode {
            handle: Self::encode(new_id),
            attr,
            directory_wcc: WccData { before: None, after: None },
        })
    }

    async fn make_dir(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
        attr: SetAttr,
    ) -> VfsResult<CreatedNode> {
        let parent_id = Self::decode(parent)?;
        let new_id = self.alloc();
        let mut nodes = self.nodes.lock().unwrap();
        nodes.get(&parent_id).ok_or(NfsError::Stale)?;
        nodes.insert(
            new_id,
            Node { kind: Kind::Dir(BTreeMap::new()), mode: attr.mode.unwrap_or(0o755), parent: parent_id },
        );
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.insert(name.0.clone(), new_id);
        }
        let result_attr = nodes[&new_id].attr(new_id);
        Ok(CreatedNode {
            handle: Self::encode(new_id),
            attr: result_attr,
            directory_wcc: WccData { before: None, after: None },
        })
    }

    async fn make_symlink(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
        target: &SymlinkTarget,
        attr: SetAttr,
    ) -> VfsResult<CreatedNode> {
        let parent_id = Self::decode(parent)?;
        let new_id = self.alloc();
        let mut nodes = self.nodes.lock().unwrap();
        nodes.get(&parent_id).ok_or(NfsError::Stale)?;
        nodes.insert(
            new_id,
            Node {
                kind: Kind::Symlink(target.0.clone()),
                mode: attr.mode.unwrap_or(0o777),
                parent: parent_id,
            },
        );
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.insert(name.0.clone(), new_id);
        }
        let result_attr = nodes[&new_id].attr(new_id);
        Ok(CreatedNode {
            handle: Self::encode(new_id),
            attr: result_attr,
            directory_wcc: WccData { before: None, after: None },
        })
    }

    async fn make_node(
        &self,
        _parent: &crate::vfs::FileHandle,
        _name: &FileName,
        _node: SpecialNode,
    ) -> VfsResult<CreatedNode> {
        Err(NfsError::NotSupp)
    }

    async fn remove(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
    ) -> VfsResult<RemovalResult> {
        let parent_id = Self::decode(parent)?;
        let mut nodes = self.nodes.lock().unwrap();
        let child_id = {
            let parent_node = nodes.get(&parent_id).ok_or(NfsError::Stale)?;
            let children = Self::dir_children(parent_node)?;
            *children.get(&name.0).ok_or(NfsError::NoEnt)?
        };
        if matches!(nodes.get(&child_id), Some(Node { kind: Kind::Dir(_), .. })) {
            return Err(NfsError::IsDir);
        }
        nodes.remove(&child_id);
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.remove(&name.0);
        }
        Ok(RemovalResult { directory_wcc: WccData { before: None, after: None } })
    }

    async fn remove_dir(
        &self,
        parent: &crate::vfs::FileHandle,
        name: &FileName,
    ) -> VfsResult<RemovalResult> {
        let parent_id = Self::decode(parent)?;
        let mut nodes = self.nodes.lock().unwrap();
        let child_id = {
            let parent_node = nodes.get(&parent_id).ok_or(NfsError::Stale)?;
            let children = Self::dir_children(parent_node)?;
            *children.get(&name.0).ok_or(NfsError::NoEnt)?
        };
        match nodes.get(&child_id) {
            Some(Node { kind: Kind::Dir(children), .. }) if !children.is_empty() => {
                return Err(NfsError::NotEmpty)
            }
            Some(Node { kind: Kind::Dir(_), .. }) => {}
            _ => return Err(NfsError::NotDir),
        }
        nodes.remove(&child_id);
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.remove(&name.0);
        }
        Ok(RemovalResult { directory_wcc: WccData { before: None, after: None } })
    }

    async fn rename(
        &self,
        from_parent: &crate::vfs::FileHandle,
        from_name: &FileName,
        to_parent: &crate::vfs::FileHandle,
        to_name: &FileName,
    ) -> VfsResult<RenameResult> {
        let from_parent_id = Self::decode(from_parent)?;
        let to_parent_id = Self::decode(to_parent)?;
        let mut nodes = self.nodes.lock().unwrap();
        let moved_id = {
            let parent_node = nodes.get(&from_parent_id).ok_or(NfsError::Stale)?;
            let children = Self::dir_children(parent_node)?;
            *children.get(&from_name.0).ok_or(NfsError::NoEnt)?
        };
        nodes.get(&to_parent_id).ok_or(NfsError::Stale)?;
        if let Kind::Dir(children) = &mut nodes.get_mut(&from_parent_id).unwrap().kind {
            children.remove(&from_name.0);
        }
        if let Kind::Dir(children) = &mut nodes.get_mut(&to_parent_id).unwrap().kind {
            children.insert(to_name.0.clone(), moved_id);
        }
        nodes.get_mut(&moved_id).unwrap().parent = to_parent_id;
        Ok(RenameResult {
            from_directory_wcc: WccData { before: None, after: None },
            to_directory_wcc: WccData { before: None, after: None },
        })
    }

    async fn link(
        &self,
        source: &crate::vfs::FileHandle,
        new_parent: &crate::vfs::FileHandle,
        new_name: &FileName,
    ) -> VfsResult<LinkResult> {
        let source_id = Self::decode(source)?;
        let parent_id = Self::decode(new_parent)?;
        let mut nodes = self.nodes.lock().unwrap();
        nodes.get(&source_id).ok_or(NfsError::Stale)?;
        nodes.get(&parent_id).ok_or(NfsError::Stale)?;
        if let Kind::Dir(children) = &mut nodes.get_mut(&parent_id).unwrap().kind {
            children.insert(new_name.0.clone(), source_id);
        }
        let attr = nodes[&source_id].attr(source_id);
        Ok(LinkResult { new_file_attr: Some(attr), directory_wcc: WccData { before: None, after: None } })
    }

    async fn read_dir(
        &self,
        handle: &crate::vfs::FileHandle,
        cookie: DirectoryCookie,
        _verifier: CookieVerifier,
        _max_bytes: u32,
    ) -> VfsResult<ReadDirResult> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        let children = Self::dir_children(node)?;
        let entries = children
            .iter()
            .filter(|(_, &child_id)| child_id as u64 > cookie.0)
            .map(|(name, &child_id)| DirectoryEntry {
                cookie: DirectoryCookie(child_id as u64),
                name: FileName(name.clone()),
                fileid: child_id as u64,
            })
            .collect();
        Ok(ReadDirResult {
            directory_attr: Some(node.attr(id)),
            cookie_verifier: CookieVerifier([0; 8]),
            entries,
            eof: true,
        })
    }

    async fn read_dir_plus(
        &self,
        handle: &crate::vfs::FileHandle,
        cookie: DirectoryCookie,
        _verifier: CookieVerifier,
        _max_bytes: u32,
        _max_handles: u32,
    ) -> VfsResult<ReadDirPlusResult> {
        let id = Self::decode(handle)?;
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(&id).ok_or(NfsError::Stale)?;
        let children = Self::dir_children(node)?.clone();
        let mut entries = Vec::new();
        for (name, child_id) in children {
            if child_id as u64 <= cookie.0 {
                continue;
            }
            let child = &nodes[&child_id];
            entries.push(DirectoryPlusEntry {
                cookie: DirectoryCookie(child_id as u64),
                name: FileName(name),
                fileid: child_id as u64,
                handle: Some(Self::encode(child_id)),
                attr: Some(child.attr(child_id)),
            });
        }
        Ok(ReadDirPlusResult {
            directory_attr: Some(node.attr(id)),
            cookie_verifier: CookieVerifier([0; 8]),
            entries,
            eof: true,
        })
    }

    async fn fs_stat(&self, handle: &crate::vfs::FileHandle) -> VfsResult<FsStat> {
        let attr = self.get_attr(handle).await.ok();
        Ok(FsStat {
            total_bytes: 1 << 30,
            free_bytes: 1 << 29,
            available_bytes: 1 << 29,
            total_files: 1000,
            free_files: 900,
            available_files: 900,
            invarsec: 0,
            file_attr: attr,
        })
    }

    async fn fs_info(&self, handle: &crate::vfs::FileHandle) -> VfsResult<FsInfo> {
        let attr = self.get_attr(handle).await.ok();
        Ok(FsInfo {
            read_max: 1 << 20,
            read_pref: 64 << 10,
            read_multiple: 1,
            write_max: 1 << 20,
            write_pref: 64 << 10,
            write_multiple: 1,
            directory_pref: 4 << 10,
            max_file_size: u64::MAX,
            time_delta: FileTime { seconds: 1, nanos: 0 },
            properties: FsProperties::LINK | FsProperties::SYMLINK | FsProperties::HOMOGENEOUS,
            file_attr: attr,
        })
    }

    async fn path_conf(&self, handle: &crate::vfs::FileHandle) -> VfsResult<PathConfig> {
        let attr = self.get_attr(handle).await.ok();
        Ok(PathConfig {
            file_attr: attr,
            max_link: 1024,
            max_name: MAX_NAME_LEN as u32,
            no_trunc: true,
            chown_restricted: true,
            case_insensitive: false,
            case_preserving: true,
        })
    }

    async fn commit(
        &self,
        handle: &crate::vfs::FileHandle,
        _offset: u64,
        _count: u32,
    ) -> VfsResult<CommitResult> {
        let attr = self.get_attr(handle).await.ok();
        Ok(CommitResult { file_attr: attr, verifier: StableVerifier([0; 8]) })
    }
}

pub(crate) fn test_vfs() -> Arc<dyn Vfs> {
    Arc::new(InMemoryVfs::new())
}

pub(crate) fn addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 2049)
}

pub(crate) fn encode_handle(h: FileHandle) -> Vec<u8> {
    let mut w = Writer::new();
    write_handle(&mut w, h);
    w.into_vec()
}

pub(crate) fn test_context(vfs: Arc<dyn Vfs>) -> Context {
    Context::new(Arc::new(MountCache::new()), vfs)
}

/// Mounts the in-memory root directory and returns its wire handle.
pub(crate) async fn mount_root(ctx: &Context) -> FileHandle {
    let aliases = AliasResolver::new();
    let source = aliases.new_source();
    aliases.set(source, vec![("/root".into(), "/root".into())], |_| true);
    let mounted =
        ctx.cache.mnt("test-client", "/root", &aliases, ctx.vfs.as_ref()).await.ok().unwrap();
    mounted.handle
}

/// Mounts a second export backed by the same `Vfs`, but a distinct host
/// path, so its `volume_serial` differs from [`mount_root`]'s — exercises
/// cross-mount/cross-volume handle comparisons.
pub(crate) async fn mount_alt_volume(ctx: &Context) -> FileHandle {
    let aliases = AliasResolver::new();
    let source = aliases.new_source();
    aliases.set(source, vec![("/alt".into(), "/alt".into())], |_| true);
    let mounted =
        ctx.cache.mnt("test-client", "/alt", &aliases, ctx.vfs.as_ref()).await.ok().unwrap();
    mounted.handle
}
