//! Network transports (spec §4.3): a UDP datagram loop and a TCP accept
//! loop with per-peer record-mark framing. Both hand decoded message bytes
//! to the same [`crate::rpc::router::Router`] — the port a call arrives on
//! never affects dispatch, only which socket produced the bytes.

pub mod tcp;
pub mod udp;

/// `RFC 1057` record-mark cap this core enforces (spec §4.3): a TCP record
/// whose length exceeds this is treated as unsupported fragmentation and the
/// connection is dropped rather than buffered further.
pub const MAX_RECORD_LEN: usize = 0x0010_0000;

/// Minimum capacity of the reusable UDP receive buffer (spec §4.3). NFSv3
/// WRITE payloads can be large, but in practice stay well under the 9000
/// byte jumbo-frame ceiling most deployments use; 64 KiB is generous enough
/// without costing much per idle listener.
pub const UDP_BUFFER_LEN: usize = 64 * 1024;
