//! Three-level {program -> version -> procedure} RPC dispatch (spec §4.4).
//!
//! The router holds no per-call state: every mapping or mount-cache lock
//! lives inside the registered [`Procedure`] implementations themselves.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::{decode_call, reply, RPC_VERSION};

/// Outcome of a single procedure invocation: either an XDR-encoded success
/// body, or a marker that the arguments did not parse.
pub type ProcOutcome = Result<Vec<u8>, crate::xdr::Invalid>;

/// A single registered RPC procedure callback.
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn call(&self, sender: SocketAddr, params: &[u8]) -> ProcOutcome;
}

/// Adapts a plain async closure into a [`Procedure`], for the common case
/// of procedures with no extra state beyond what they close over.
pub struct FnProcedure<F>(pub F);

#[async_trait]
impl<F, Fut> Procedure for FnProcedure<F>
where
    F: Fn(SocketAddr, Vec<u8>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ProcOutcome> + Send,
{
    async fn call(&self, sender: SocketAddr, params: &[u8]) -> ProcOutcome {
        (self.0)(sender, params.to_vec()).await
    }
}

#[derive(Default)]
struct VersionTable {
    procedures: HashMap<u32, Arc<dyn Procedure>>,
}

#[derive(Default)]
struct ProgramTable {
    versions: HashMap<u32, VersionTable>,
}

/// The RPC router: program/version/procedure registry plus envelope
/// validation and reply-building.
#[derive(Default)]
pub struct Router {
    programs: HashMap<u32, ProgramTable>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        program: u32,
        version: u32,
        procedure: u32,
        handler: Arc<dyn Procedure>,
    ) {
        self.programs
            .entry(program)
            .or_default()
            .versions
            .entry(version)
            .or_default()
            .procedures
            .insert(procedure, handler);
    }

    /// Returns `(low, high)` version bounds registered for `program`, if any.
    fn version_bounds(table: &ProgramTable) -> Option<(u32, u32)> {
        let mut versions: Vec<u32> = table.versions.keys().copied().collect();
        versions.sort_unstable();
        versions.first().copied().zip(versions.last().copied())
    }

    /// Decodes, dispatches, and replies to one RPC message. Returns `None`
    /// when the message should be silently dropped (malformed envelope, or
    /// wrong RPC version over a transport that demands silence — callers
    /// that want a `RPC_MISMATCH` reply get one via `Some`).
    pub async fn dispatch(&self, sender: SocketAddr, bytes: &[u8]) -> Option<Vec<u8>> {
        let call = decode_call(bytes)?;

        if call.rpc_version != RPC_VERSION {
            warn!(xid = call.xid, version = call.rpc_version, "rpc version mismatch");
            return Some(reply(call.xid).reject().mismatch(RPC_VERSION, RPC_VERSION));
        }

        let Some(program) = self.programs.get(&call.program) else {
            debug!(xid = call.xid, program = call.program, "program unavailable");
            return Some(reply(call.xid).accept().null_auth().program_unavailable());
        };

        let Some(version) = program.versions.get(&call.version) else {
            let (low, high) = Self::version_bounds(program).unwrap_or((0, 0));
            debug!(xid = call.xid, version = call.version, "program version mismatch");
            return Some(reply(call.xid).accept().null_auth().program_mismatch(low, high));
        };

        let Some(handler) = version.procedures.get(&call.procedure) else {
            debug!(xid = call.xid, procedure = call.procedure, "procedure unavailable");
            return Some(reply(call.xid).accept().null_auth().procedure_unavailable());
        };

        trace!(xid = call.xid, program = call.program, procedure = call.procedure, "dispatch");
        match handler.call(sender, &call.params).await {
            Ok(body) => Some(reply(call.xid).accept().null_auth().success(&body)),
            Err(_) => Some(reply(call.xid).accept().null_auth().garbage_args()),
        }
    }
}
