//! `PORTMAP` protocol implementation (RFC 1833 v2, as referenced by RFC 1813
//! §5.0): a mapping table from `{program, version, protocol}` to `port`.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use crate::buffer::{Cursor, Writer};
use crate::rpc::router::{FnProcedure, ProcOutcome, Router};
use crate::xdr;

/// RPC program number (RFC 1833 §3).
pub const PROGRAM: u32 = 100000;
pub const VERSION: u32 = 2;

pub const IPPROTO_TCP: u32 = 6;
pub const IPPROTO_UDP: u32 = 17;

pub mod procedure {
    pub const NULL: u32 = 0;
    pub const SET: u32 = 1;
    pub const UNSET: u32 = 2;
    pub const GETPORT: u32 = 3;
    pub const DUMP: u32 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    program: u32,
    version: u32,
    protocol: u32,
    port: u32,
}

/// The portmap mapping table (spec §4.5). Reads (`GETPORT`) vastly
/// outnumber writes (`SET`/`UNSET`), so a single `RwLock` is enough;
/// there's no per-entry contention to shard the way the mount cache does.
pub struct PortmapTable {
    mappings: RwLock<Vec<Mapping>>,
}

impl Default for PortmapTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PortmapTable {
    pub fn new() -> Self {
        Self { mappings: RwLock::new(Vec::new()) }
    }

    /// Pre-registers the three programs this server always advertises, so a
    /// client's GETPORT succeeds without a prior SET call.
    pub fn with_defaults(nfs_port: u16, mount_port: u16, portmap_port: u16) -> Self {
        let table = Self::new();
        for protocol in [IPPROTO_TCP, IPPROTO_UDP] {
            table.set(PROGRAM, VERSION, protocol, portmap_port as u32);
            table.set(crate::mount::PROGRAM, crate::mount::VERSION, protocol, mount_port as u32);
            table.set(crate::nfs3::PROGRAM, crate::nfs3::VERSION, protocol, nfs_port as u32);
        }
        table
    }

    /// `SET` (spec §4.5): adds the mapping if no entry already matches on
    /// `{program, version, protocol}`. Returns whether it was added.
    pub fn set(&self, program: u32, version: u32, protocol: u32, port: u32) -> bool {
        if protocol != IPPROTO_TCP && protocol != IPPROTO_UDP {
            return false;
        }
        let mut mappings = self.mappings.write().unwrap();
        if mappings.iter().any(|m| m.program == program && m.version == version && m.protocol == protocol) {
            return false;
        }
        mappings.push(Mapping { program, version, protocol, port });
        true
    }

    /// `UNSET` (spec §4.5): removes the matching triple, returning whether
    /// an entry was removed.
    pub fn unset(&self, program: u32, version: u32, protocol: u32) -> bool {
        let mut mappings = self.mappings.write().unwrap();
        let before = mappings.len();
        mappings.retain(|m| !(m.program == program && m.version == version && m.protocol == protocol));
        mappings.len() != before
    }

    /// `GETPORT` (spec §4.5): returns the matching port, or `0`.
    pub fn get_port(&self, program: u32, version: u32, protocol: u32) -> u32 {
        self.mappings
            .read()
            .unwrap()
            .iter()
            .find(|m| m.program == program && m.version == version && m.protocol == protocol)
            .map(|m| m.port)
            .unwrap_or(0)
    }

    fn dump(&self) -> Vec<Mapping> {
        self.mappings.read().unwrap().clone()
    }
}

async fn null(_sender: SocketAddr, _params: &[u8]) -> ProcOutcome {
    Ok(Vec::new())
}

fn read_mapping(cur: &mut Cursor) -> xdr::Result<(u32, u32, u32, u32)> {
    let program = xdr::read_u32(cur)?;
    let version = xdr::read_u32(cur)?;
    let protocol = xdr::read_u32(cur)?;
    let port = xdr::read_u32(cur)?;
    Ok((program, version, protocol, port))
}

async fn set(_sender: SocketAddr, params: &[u8], table: &PortmapTable) -> ProcOutcome {
    let mut cur = Cursor::new(params);
    let (program, version, protocol, port) = read_mapping(&mut cur)?;
    let mut w = Writer::new();
    xdr::write_bool(&mut w, table.set(program, version, protocol, port));
    Ok(w.into_vec())
}

async fn unset(_sender: SocketAddr, params: &[u8], table: &PortmapTable) -> ProcOutcome {
    let mut cur = Cursor::new(params);
    let (program, version, protocol, _port) = read_mapping(&mut cur)?;
    let mut w = Writer::new();
    xdr::write_bool(&mut w, table.unset(program, version, protocol));
    Ok(w.into_vec())
}

async fn getport(_sender: SocketAddr, params: &[u8], table: &PortmapTable) -> ProcOutcome {
    let mut cur = Cursor::new(params);
    let program = xdr::read_u32(&mut cur)?;
    let version = xdr::read_u32(&mut cur)?;
    let protocol = xdr::read_u32(&mut cur)?;
    let _port = xdr::read_u32(&mut cur)?;
    let mut w = Writer::new();
    w.append_u32(table.get_port(program, version, protocol));
    Ok(w.into_vec())
}

async fn dump(_sender: SocketAddr, _params: &[u8], table: &PortmapTable) -> ProcOutcome {
    let mut w = Writer::new();
    xdr::write_list(&mut w, &table.dump(), |w, m| {
        w.append_u32(m.program);
        w.append_u32(m.version);
        w.append_u32(m.protocol);
        w.append_u32(m.port);
    });
    Ok(w.into_vec())
}

/// Registers NULL/SET/UNSET/GETPORT/DUMP against `router`.
pub fn register(router: &mut Router, table: Arc<PortmapTable>) {
    router.register(
        PROGRAM,
        VERSION,
        procedure::NULL,
        Arc::new(FnProcedure(|sender, params| async move { null(sender, &params).await })),
    );

    {
        let table = table.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::SET,
            Arc::new(FnProcedure(move |sender, params| {
                let table = table.clone();
                async move { set(sender, &params, &table).await }
            })),
        );
    }

    {
        let table = table.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::UNSET,
            Arc::new(FnProcedure(move |sender, params| {
                let table = table.clone();
                async move { unset(sender, &params, &table).await }
            })),
        );
    }

    {
        let table = table.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::GETPORT,
            Arc::new(FnProcedure(move |sender, params| {
                let table = table.clone();
                async move { getport(sender, &params, &table).await }
            })),
        );
    }

    {
        let table = table.clone();
        router.register(
            PROGRAM,
            VERSION,
            procedure::DUMP,
            Arc::new(FnProcedure(move |sender, params| {
                let table = table.clone();
                async move { dump(sender, &params, &table).await }
            })),
        );
    }
}
