//! Wire layout of the 64-byte opaque NFSv3 file handle (spec §6).
//!
//! `{mount_id: u64, volume_serial: u64, file_id: u128}` occupy the first 32
//! bytes; the remaining 32 are reserved and always zero. This
//! implementation encodes all three fields big-endian for portability —
//! the original source stores them in host-native byte order, which spec
//! §9's Design Notes flags as exactly the kind of endian-native-persistence
//! assumption a portable rewrite should not carry forward.

use crate::buffer::Cursor;

pub const WIRE_LEN: usize = 64;
const MEANINGFUL_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    pub mount_id: u64,
    pub volume_serial: u64,
    pub file_id: u128,
}

impl FileHandle {
    pub fn new(mount_id: u64, volume_serial: u64, file_id: u128) -> Self {
        Self { mount_id, volume_serial, file_id }
    }

    /// Encodes the handle as the full 64-byte wire representation.
    pub fn to_wire(self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        out[0..8].copy_from_slice(&self.mount_id.to_be_bytes());
        out[8..16].copy_from_slice(&self.volume_serial.to_be_bytes());
        out[16..32].copy_from_slice(&self.file_id.to_be_bytes());
        out
    }

    /// Decodes a handle from wire bytes. Accepts any length `>= 32`
    /// (RFC 1813 handles are a variable-length opaque up to 64 bytes) as
    /// long as the meaningful prefix is present; rejects anything shorter.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MEANINGFUL_LEN {
            return None;
        }
        let mut cur = Cursor::new(bytes);
        let mount_id = cur.read_u64_be()?;
        let volume_serial = cur.read_u64_be()?;
        let file_id = cur.read_u128_be()?;
        Some(Self { mount_id, volume_serial, file_id })
    }

    /// The adapter-facing opaque id: the low bytes the demo filesystem
    /// treats as its own node id. Kept separate from `file_id` so a
    /// non-128-bit adapter id space still round-trips.
    pub fn vfs_handle(self) -> crate::vfs::FileHandle {
        crate::vfs::FileHandle(self.file_id.to_be_bytes().to_vec())
    }

    /// Rewraps an adapter-facing handle returned from a `Vfs` call (e.g. a
    /// freshly created node) back into a wire handle, inheriting the
    /// `mount_id`/`volume_serial` of the handle the call was made against.
    /// Adapter ids longer than 16 bytes don't fit `file_id` and are rejected.
    pub fn from_vfs(mount_id: u64, volume_serial: u64, vfs_handle: &crate::vfs::FileHandle) -> Option<Self> {
        let bytes = &vfs_handle.0;
        if bytes.len() > 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        Some(Self { mount_id, volume_serial, file_id: u128::from_be_bytes(buf) })
    }
}
