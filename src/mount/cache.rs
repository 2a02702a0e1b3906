//! Mount cache: the MOUNT program's session state (spec §4.7).
//!
//! A single exclusive lock guards every mutation, including the MNT
//! find-or-insert sequence — steps 1-5 run as one atomic unit so two
//! racing MNT calls for the same path never mint two mount ids.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::buffer::{Cursor, Writer};
use crate::mount::alias::AliasResolver;
use crate::nfs3::handle::FileHandle;
use crate::vfs::{FsPath, Vfs, VfsResult};

struct MountEntry {
    host_path: String,
    volume_serial: u64,
    root_file_id: u128,
    clients: HashSet<String>,
}

struct State {
    mount_map: HashMap<u64, MountEntry>,
    windows_map: HashMap<String, u64>,
    query_map: HashMap<String, u64>,
    client_mounts: HashMap<String, HashSet<u64>>,
    next_mount_id: u64,
}

impl State {
    fn new() -> Self {
        Self {
            mount_map: HashMap::new(),
            windows_map: HashMap::new(),
            query_map: HashMap::new(),
            client_mounts: HashMap::new(),
            next_mount_id: 1,
        }
    }

    fn bind(&mut self, client: &str, mount_id: u64) {
        self.client_mounts.entry(client.to_string()).or_default().insert(mount_id);
        if let Some(entry) = self.mount_map.get_mut(&mount_id) {
            entry.clients.insert(client.to_string());
        }
    }

    fn unbind(&mut self, client: &str, mount_id: u64) {
        if let Some(set) = self.client_mounts.get_mut(client) {
            set.remove(&mount_id);
            if set.is_empty() {
                self.client_mounts.remove(client);
            }
        }
        if let Some(entry) = self.mount_map.get_mut(&mount_id) {
            entry.clients.remove(client);
        }
    }
}

/// Outcome of a successful MNT.
pub struct Mounted {
    pub handle: FileHandle,
}

/// What went wrong resolving or opening a MNT target.
pub enum MountError {
    NotFound,
    OpenFailed,
}

/// The MOUNT program's mount table plus the alias resolver it consults on
/// a cache miss.
pub struct MountCache {
    state: Mutex<State>,
}

impl Default for MountCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MountCache {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::new()) }
    }

    /// Runs the MNT find-or-insert algorithm (spec §4.7 steps 1-5).
    pub async fn mnt(
        &self,
        client: &str,
        query_path: &str,
        aliases: &AliasResolver,
        vfs: &dyn Vfs,
    ) -> Result<Mounted, MountError> {
        // Step 1: query_map hit.
        {
            let mut state = self.state.lock().unwrap();
            if let Some(&mount_id) = state.query_map.get(query_path) {
                state.bind(client, mount_id);
                let entry = &state.mount_map[&mount_id];
                return Ok(Mounted {
                    handle: FileHandle::new(mount_id, entry.volume_serial, entry.root_file_id),
                });
            }
        }

        // Step 2: resolve alias.
        let host_path = aliases.resolve(query_path).ok_or(MountError::NotFound)?;

        // Step 3: windows_map hit.
        {
            let mut state = self.state.lock().unwrap();
            if let Some(&mount_id) = state.windows_map.get(&host_path) {
                state.query_map.insert(query_path.to_string(), mount_id);
                state.bind(client, mount_id);
                let entry = &state.mount_map[&mount_id];
                return Ok(Mounted {
                    handle: FileHandle::new(mount_id, entry.volume_serial, entry.root_file_id),
                });
            }
        }

        // Step 4: open via the filesystem adapter and mint a fresh mount.
        let opened =
            vfs.open_path(&FsPath(host_path.clone())).await.map_err(|_| MountError::OpenFailed)?;
        let root_file_id = opened.attr.fileid as u128;

        let mut state = self.state.lock().unwrap();
        // Another racer may have inserted the same path while we were
        // awaiting open_path; re-check before minting.
        if let Some(&mount_id) = state.windows_map.get(&opened.canonical_path) {
            state.query_map.insert(query_path.to_string(), mount_id);
            state.bind(client, mount_id);
            let entry = &state.mount_map[&mount_id];
            return Ok(Mounted {
                handle: FileHandle::new(mount_id, entry.volume_serial, entry.root_file_id),
            });
        }

        let mount_id = state.next_mount_id;
        state.next_mount_id += 1;
        state.mount_map.insert(
            mount_id,
            MountEntry {
                host_path: opened.canonical_path.clone(),
                volume_serial: opened.volume_serial,
                root_file_id,
                clients: HashSet::new(),
            },
        );
        state.windows_map.insert(opened.canonical_path, mount_id);
        state.query_map.insert(query_path.to_string(), mount_id);
        state.bind(client, mount_id);

        Ok(Mounted { handle: FileHandle::new(mount_id, opened.volume_serial, root_file_id) })
    }

    /// UMNT: drops `client`'s membership in `query_path`'s mount. The mount
    /// entry itself is retained.
    pub fn umnt(&self, client: &str, query_path: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(&mount_id) = state.query_map.get(query_path) {
            state.unbind(client, mount_id);
        }
    }

    /// UMNTALL: drops every mount membership for `client`.
    pub fn umnt_all(&self, client: &str) {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<u64> = state.client_mounts.get(client).into_iter().flatten().copied().collect();
        for mount_id in ids {
            state.unbind(client, mount_id);
        }
    }

    /// Validates that `mount_id` is present and `volume_serial` matches —
    /// the first two checks of every NFSv3 procedure's handle validation
    /// (spec §4.8).
    pub fn validate(&self, mount_id: u64, volume_serial: u64) -> bool {
        let state = self.state.lock().unwrap();
        state.mount_map.get(&mount_id).is_some_and(|e| e.volume_serial == volume_serial)
    }

    /// The list of mounts currently bound to any client, for DUMP.
    pub fn dump(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for (client, ids) in &state.client_mounts {
            for id in ids {
                if let Some(entry) = state.mount_map.get(id) {
                    out.push((client.clone(), entry.host_path.clone()));
                }
            }
        }
        out
    }

    /// Serializes the cache to the persistence format (spec §4.7):
    /// big-endian throughout, host paths as UTF-16 to match the
    /// Windows-native path representation the format was designed around.
    pub fn save(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        let mut w = Writer::new();

        w.append_u32(state.mount_map.len() as u32);
        for (&mount_id, entry) in &state.mount_map {
            w.append_u64(mount_id);
            let utf16: Vec<u16> = entry.host_path.encode_utf16().collect();
            w.append_u32(utf16.len() as u32);
            for unit in utf16 {
                w.append_u16(unit);
            }
        }

        w.append_u32(state.query_map.len() as u32);
        for (query_path, &mount_id) in &state.query_map {
            let bytes = query_path.as_bytes();
            w.append_u32(bytes.len() as u32);
            w.append_bytes(bytes);
            w.append_u64(mount_id);
        }

        w.append_u32(state.client_mounts.len() as u32);
        for (client, ids) in &state.client_mounts {
            let bytes = client.as_bytes();
            w.append_u32(bytes.len() as u32);
            w.append_bytes(bytes);
            w.append_u32(ids.len() as u32);
            for &id in ids {
                w.append_u64(id);
            }
        }

        w.into_vec()
    }

    /// Restores a cache from `save`'s format. Mount entries whose host
    /// path does not open successfully are dropped; queries and client
    /// memberships referencing a dropped mount are silently discarded.
    pub async fn load(bytes: &[u8], vfs: &dyn Vfs) -> VfsResult<Self> {
        let mut cur = Cursor::new(bytes);
        let mut mount_map = HashMap::new();
        let mut max_id = 0u64;

        let n_mounts = cur.read_u32_be().unwrap_or(0);
        for _ in 0..n_mounts {
            let Some(mount_id) = cur.read_u64_be() else { break };
            let Some(len) = cur.read_u32_be() else { break };
            let mut units = Vec::with_capacity(len as usize);
            for _ in 0..len {
                let Some(unit) = cur.read_u16_be() else { break };
                units.push(unit);
            }
            let host_path = String::from_utf16_lossy(&units);
            max_id = max_id.max(mount_id);

            if let Ok(opened) = vfs.open_path(&FsPath(host_path.clone())).await {
                mount_map.insert(
                    mount_id,
                    MountEntry {
                        host_path: opened.canonical_path,
                        volume_serial: opened.volume_serial,
                        root_file_id: opened.attr.fileid as u128,
                        clients: HashSet::new(),
                    },
                );
            }
        }

        let mut windows_map = HashMap::new();
        for (&id, entry) in &mount_map {
            windows_map.insert(entry.host_path.clone(), id);
        }

        let mut query_map = HashMap::new();
        let n_queries = cur.read_u32_be().unwrap_or(0);
        for _ in 0..n_queries {
            let Some(qlen) = cur.read_u32_be() else { break };
            let Some(qbytes) = cur.read_bytes(qlen as usize) else { break };
            let Some(mount_id) = cur.read_u64_be() else { break };
            if mount_map.contains_key(&mount_id) {
                query_map.insert(String::from_utf8_lossy(qbytes).into_owned(), mount_id);
            }
        }

        let mut client_mounts = HashMap::new();
        let n_clients = cur.read_u32_be().unwrap_or(0);
        for _ in 0..n_clients {
            let Some(clen) = cur.read_u32_be() else { break };
            let Some(cbytes) = cur.read_bytes(clen as usize) else { break };
            let Some(n_ids) = cur.read_u32_be() else { break };
            let client = String::from_utf8_lossy(cbytes).into_owned();
            let mut ids = HashSet::new();
            for _ in 0..n_ids {
                let Some(mount_id) = cur.read_u64_be() else { break };
                if mount_map.contains_key(&mount_id) {
                    ids.insert(mount_id);
                    mount_map.get_mut(&mount_id).unwrap().clients.insert(client.clone());
                }
            }
            if !ids.is_empty() {
                client_mounts.insert(client, ids);
            }
        }

        Ok(Self {
            state: Mutex::new(State {
                mount_map,
                windows_map,
                query_map,
                client_mounts,
                next_mount_id: max_id + 1,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{FileAttr, FileTime, FileType, NfsError, OpenedMount};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeVfs {
        serial: AtomicU64,
        openable: bool,
    }

    fn zero_attr() -> FileAttr {
        FileAttr {
            file_type: FileType::Directory,
            mode: 0o755,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: 0,
            used: 0,
            device: None,
            fsid: 0,
            fileid: 1,
            atime: FileTime { seconds: 0, nanos: 0 },
            mtime: FileTime { seconds: 0, nanos: 0 },
            ctime: FileTime { seconds: 0, nanos: 0 },
        }
    }

    #[async_trait]
    impl Vfs for FakeVfs {
        async fn null(&self) -> VfsResult<()> {
            Ok(())
        }
        async fn open_path(&self, path: &FsPath) -> VfsResult<OpenedMount> {
            if !self.openable {
                return Err(NfsError::NoEnt);
            }
            let serial = self.serial.fetch_add(1, Ordering::Relaxed);
            Ok(OpenedMount {
                handle: crate::vfs::FileHandle(vec![1]),
                canonical_path: path.0.clone(),
                volume_serial: serial,
                attr: zero_attr(),
            })
        }
        async fn get_attr(&self, _: &crate::vfs::FileHandle) -> VfsResult<FileAttr> {
            unimplemented!()
        }
        async fn set_attr(
            &self,
            _: &crate::vfs::FileHandle,
            _: crate::vfs::SetAttr,
            _: crate::vfs::SetAttrGuard,
        ) -> VfsResult<crate::vfs::WccData> {
            unimplemented!()
        }
        async fn lookup(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
        ) -> VfsResult<crate::vfs::LookupResult> {
            unimplemented!()
        }
        async fn access(
            &self,
            _: &crate::vfs::FileHandle,
            _: crate::vfs::AccessMask,
        ) -> VfsResult<crate::vfs::AccessResult> {
            unimplemented!()
        }
        async fn read_link(
            &self,
            _: &crate::vfs::FileHandle,
        ) -> VfsResult<(crate::vfs::SymlinkTarget, Option<FileAttr>)> {
            unimplemented!()
        }
        async fn read(
            &self,
            _: &crate::vfs::FileHandle,
            _: u64,
            _: u32,
        ) -> VfsResult<crate::vfs::ReadResult> {
            unimplemented!()
        }
        async fn write(
            &self,
            _: &crate::vfs::FileHandle,
            _: u64,
            _: &[u8],
            _: crate::vfs::WriteMode,
        ) -> VfsResult<crate::vfs::WriteResult> {
            unimplemented!()
        }
        async fn create(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
            _: crate::vfs::CreateMode,
        ) -> VfsResult<crate::vfs::CreatedNode> {
            unimplemented!()
        }
        async fn make_dir(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
            _: crate::vfs::SetAttr,
        ) -> VfsResult<crate::vfs::CreatedNode> {
            unimplemented!()
        }
        async fn make_symlink(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
            _: &crate::vfs::SymlinkTarget,
            _: crate::vfs::SetAttr,
        ) -> VfsResult<crate::vfs::CreatedNode> {
            unimplemented!()
        }
        async fn make_node(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
            _: crate::vfs::SpecialNode,
        ) -> VfsResult<crate::vfs::CreatedNode> {
            unimplemented!()
        }
        async fn remove(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
        ) -> VfsResult<crate::vfs::RemovalResult> {
            unimplemented!()
        }
        async fn remove_dir(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
        ) -> VfsResult<crate::vfs::RemovalResult> {
            unimplemented!()
        }
        async fn rename(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
        ) -> VfsResult<crate::vfs::RenameResult> {
            unimplemented!()
        }
        async fn link(
            &self,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileHandle,
            _: &crate::vfs::FileName,
        ) -> VfsResult<crate::vfs::LinkResult> {
            unimplemented!()
        }
        async fn read_dir(
            &self,
            _: &crate::vfs::FileHandle,
            _: crate::vfs::DirectoryCookie,
            _: crate::vfs::CookieVerifier,
            _: u32,
        ) -> VfsResult<crate::vfs::ReadDirResult> {
            unimplemented!()
        }
        async fn read_dir_plus(
            &self,
            _: &crate::vfs::FileHandle,
            _: crate::vfs::DirectoryCookie,
            _: crate::vfs::CookieVerifier,
            _: u32,
            _: u32,
        ) -> VfsResult<crate::vfs::ReadDirPlusResult> {
            unimplemented!()
        }
        async fn fs_stat(&self, _: &crate::vfs::FileHandle) -> VfsResult<crate::vfs::FsStat> {
            unimplemented!()
        }
        async fn fs_info(&self, _: &crate::vfs::FileHandle) -> VfsResult<crate::vfs::FsInfo> {
            unimplemented!()
        }
        async fn path_conf(
            &self,
            _: &crate::vfs::FileHandle,
        ) -> VfsResult<crate::vfs::PathConfig> {
            unimplemented!()
        }
        async fn commit(
            &self,
            _: &crate::vfs::FileHandle,
            _: u64,
            _: u32,
        ) -> VfsResult<crate::vfs::CommitResult> {
            unimplemented!()
        }
    }

    fn openable_vfs() -> FakeVfs {
        FakeVfs { serial: AtomicU64::new(100), openable: true }
    }

    #[tokio::test]
    async fn mnt_mints_one_id_and_is_idempotent_per_client() {
        let cache = MountCache::new();
        let aliases = AliasResolver::new();
        let src = aliases.new_source();
        aliases.set(src, vec![(r"C:\shared".into(), "/shared".into())], |_| true);
        let vfs = openable_vfs();

        let first = cache.mnt("client-a", "/shared", &aliases, &vfs).await.ok().unwrap();
        let second = cache.mnt("client-a", "/shared", &aliases, &vfs).await.ok().unwrap();
        assert_eq!(first.handle.mount_id, second.handle.mount_id);
    }

    #[tokio::test]
    async fn second_client_reuses_existing_mount() {
        let cache = MountCache::new();
        let aliases = AliasResolver::new();
        let src = aliases.new_source();
        aliases.set(src, vec![(r"C:\shared".into(), "/shared".into())], |_| true);
        let vfs = openable_vfs();

        let a = cache.mnt("client-a", "/shared", &aliases, &vfs).await.ok().unwrap();
        let b = cache.mnt("client-b", "/shared", &aliases, &vfs).await.ok().unwrap();
        assert_eq!(a.handle.mount_id, b.handle.mount_id);
        assert_eq!(cache.dump().len(), 2);
    }

    #[tokio::test]
    async fn umnt_retains_mount_entry() {
        let cache = MountCache::new();
        let aliases = AliasResolver::new();
        let src = aliases.new_source();
        aliases.set(src, vec![(r"C:\shared".into(), "/shared".into())], |_| true);
        let vfs = openable_vfs();

        let mounted = cache.mnt("client-a", "/shared", &aliases, &vfs).await.ok().unwrap();
        cache.umnt("client-a", "/shared");
        assert!(cache.dump().is_empty());
        assert!(cache.validate(mounted.handle.mount_id, mounted.handle.volume_serial));
    }

    #[tokio::test]
    async fn unresolvable_alias_is_not_found() {
        let cache = MountCache::new();
        let aliases = AliasResolver::new();
        let vfs = openable_vfs();
        assert!(matches!(
            cache.mnt("client-a", "/nope", &aliases, &vfs).await,
            Err(MountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn save_and_load_round_trips_reachable_mounts() {
        let cache = MountCache::new();
        let aliases = AliasResolver::new();
        let src = aliases.new_source();
        aliases.set(src, vec![(r"C:\shared".into(), "/shared".into())], |_| true);
        let vfs = openable_vfs();
        cache.mnt("client-a", "/shared", &aliases, &vfs).await.ok().unwrap();

        let bytes = cache.save();
        let restored = MountCache::load(&bytes, &vfs).await.unwrap();
        assert_eq!(restored.dump(), cache.dump());
    }
}
