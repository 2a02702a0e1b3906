//! ONC RPC (RFC 1057 / RFC 5531) message envelope: CALL decoding and a
//! fluent REPLY builder.
//!
//! Decoding never fails loudly: a malformed envelope yields `None` and the
//! caller (the transport loop) drops the datagram/record without a reply,
//! per spec §4.2 ("malformed messages are silently dropped").

pub mod router;

use crate::buffer::{Cursor, Writer};
use crate::xdr;

pub const RPC_VERSION: u32 = 2;
const MAX_AUTH_SIZE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum MsgType {
    Call = 0,
    Reply = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum ReplyBody {
    MsgAccepted = 0,
    MsgDenied = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum AcceptStat {
    Success = 0,
    ProgUnavail = 1,
    ProgMismatch = 2,
    ProcUnavail = 3,
    GarbageArgs = 4,
    #[allow(dead_code)]
    SystemErr = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum RejectedReply {
    RpcMismatch = 0,
    AuthError = 1,
}

/// `AUTH_NONE`, the only flavor this core ever emits on a reply verifier.
pub const AUTH_NONE: u32 = 0;

/// Parsed `opaque_auth`: flavor plus an unvalidated opaque body.
///
/// Spec §4.2: "credential/verifier contents on inbound CALL are parsed but
/// not validated in this core" — so the flavor is kept as a raw `u32`
/// rather than decoded into an enum that could fail on unknown flavors.
#[derive(Debug, Clone)]
pub struct OpaqueAuth {
    pub flavor: u32,
    pub body: Vec<u8>,
}

impl OpaqueAuth {
    pub fn none() -> Self {
        Self { flavor: AUTH_NONE, body: Vec::new() }
    }

    fn decode(cur: &mut Cursor) -> xdr::Result<Self> {
        let flavor = xdr::read_u32(cur)?;
        let (body, _) = xdr::read_opaque(cur, MAX_AUTH_SIZE)?;
        Ok(Self { flavor, body })
    }

    fn encode(&self, w: &mut Writer) {
        w.append_u32(self.flavor);
        // The verifier body this core emits is always empty; if a caller
        // ever attaches one, truncate rather than panic.
        let body = if self.body.len() > MAX_AUTH_SIZE {
            &self.body[..MAX_AUTH_SIZE]
        } else {
            &self.body[..]
        };
        let _ = xdr::write_opaque(w, body, MAX_AUTH_SIZE);
    }
}

/// A decoded `CALL` message with its XDR argument payload left undecoded —
/// the matched procedure callback is responsible for parsing `params`.
#[derive(Debug, Clone)]
pub struct Call {
    pub xid: u32,
    pub rpc_version: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
    pub params: Vec<u8>,
}

/// Decodes an RPC envelope. Returns `None` on any malformed input,
/// including a message tagged `REPLY` (this core only ever receives CALLs).
pub fn decode_call(bytes: &[u8]) -> Option<Call> {
    let mut cur = Cursor::new(bytes);
    let xid = cur.read_u32_be()?;
    let msg_type = cur.read_u32_be()?;
    if msg_type != MsgType::Call as u32 {
        return None;
    }
    let rpc_version = cur.read_u32_be()?;
    let program = cur.read_u32_be()?;
    let version = cur.read_u32_be()?;
    let procedure = cur.read_u32_be()?;
    let cred = OpaqueAuth::decode(&mut cur).ok()?;
    let verf = OpaqueAuth::decode(&mut cur).ok()?;
    let params = bytes[cur.position()..].to_vec();
    Some(Call { xid, rpc_version, program, version, procedure, cred, verf, params })
}

/// Entry point for the fluent reply builder described in spec §4.2:
/// `reply(xid).accept().null_auth().success(bytes)`.
pub fn reply(xid: u32) -> Reply {
    Reply { xid }
}

pub struct Reply {
    xid: u32,
}

impl Reply {
    pub fn accept(self) -> Accepted {
        Accepted { xid: self.xid }
    }

    pub fn reject(self) -> Rejected {
        Rejected { xid: self.xid }
    }
}

pub struct Accepted {
    xid: u32,
}

impl Accepted {
    /// This core always replies with `AUTH_NONE`; see spec §4.2.
    pub fn null_auth(self) -> AcceptedAuth {
        AcceptedAuth { xid: self.xid, verf: OpaqueAuth::none() }
    }
}

fn header(xid: u32, body: ReplyBody) -> Writer {
    let mut w = Writer::new();
    w.append_u32(xid);
    w.append_u32(MsgType::Reply as u32);
    w.append_u32(body as u32);
    w
}

pub struct AcceptedAuth {
    xid: u32,
    verf: OpaqueAuth,
}

impl AcceptedAuth {
    fn base(&self) -> Writer {
        let mut w = header(self.xid, ReplyBody::MsgAccepted);
        self.verf.encode(&mut w);
        w
    }

    pub fn success(self, result_body: &[u8]) -> Vec<u8> {
        let mut w = self.base();
        w.append_u32(AcceptStat::Success as u32);
        w.append_bytes(result_body);
        w.into_vec()
    }

    pub fn program_unavailable(self) -> Vec<u8> {
        let mut w = self.base();
        w.append_u32(AcceptStat::ProgUnavail as u32);
        w.into_vec()
    }

    pub fn program_mismatch(self, low: u32, high: u32) -> Vec<u8> {
        let mut w = self.base();
        w.append_u32(AcceptStat::ProgMismatch as u32);
        w.append_u32(low);
        w.append_u32(high);
        w.into_vec()
    }

    pub fn procedure_unavailable(self) -> Vec<u8> {
        let mut w = self.base();
        w.append_u32(AcceptStat::ProcUnavail as u32);
        w.into_vec()
    }

    pub fn garbage_args(self) -> Vec<u8> {
        let mut w = self.base();
        w.append_u32(AcceptStat::GarbageArgs as u32);
        w.into_vec()
    }
}

pub struct Rejected {
    xid: u32,
}

impl Rejected {
    pub fn mismatch(self, low: u32, high: u32) -> Vec<u8> {
        let mut w = header(self.xid, ReplyBody::MsgDenied);
        w.append_u32(RejectedReply::RpcMismatch as u32);
        w.append_u32(low);
        w.append_u32(high);
        w.into_vec()
    }

    pub fn auth_error(self, stat: u32) -> Vec<u8> {
        let mut w = header(self.xid, ReplyBody::MsgDenied);
        w.append_u32(RejectedReply::AuthError as u32);
        w.append_u32(stat);
        w.into_vec()
    }
}
