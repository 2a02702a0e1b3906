//! TCP accept loop with per-peer record-mark framing (spec §4.3).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, trace, warn};
use whirlwind::ShardMap;

use crate::buffer::Writer;
use crate::rpc::router::Router;

use super::MAX_RECORD_LEN;

const RECORD_MARK_LEN: usize = 4;
const LAST_FRAGMENT_BIT: u32 = 0x8000_0000;
const LENGTH_MASK: u32 = 0x7FFF_FFFF;

/// Accepts connections forever, spawning one task per peer. A second
/// connection from an `ip:port` already tracked replaces the prior task
/// (spec §4.3): the old task is aborted before the new one is recorded.
pub async fn serve(listener: TcpListener, router: Arc<Router>) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    let sessions: Arc<ShardMap<SocketAddr, tokio::task::AbortHandle>> = Arc::new(ShardMap::new());
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%local, %err, "tcp accept failed");
                continue;
            }
        };
        debug!(%local, %peer, "tcp connection accepted");

        let router = router.clone();
        let sessions_for_task = sessions.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = handle_peer(stream, peer, &router).await {
                debug!(%peer, %err, "tcp connection closed");
            }
            sessions_for_task.remove(&peer).await;
        });

        if let Some(previous) = sessions.insert(peer, handle.abort_handle()).await {
            debug!(%peer, "replacing prior connection from same address");
            previous.abort();
        }
    }
}

async fn handle_peer(
    mut stream: TcpStream,
    peer: SocketAddr,
    router: &Router,
) -> std::io::Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut read_buf = [0u8; 4096];

    loop {
        while let Some(frame_len) = record_mark(&buf)? {
            let body = buf[RECORD_MARK_LEN..RECORD_MARK_LEN + frame_len].to_vec();
            trace!(%peer, frame_len, "tcp record dispatched");
            if let Some(response) = router.dispatch(peer, &body).await {
                if !response.is_empty() {
                    let mut w = Writer::with_capacity(RECORD_MARK_LEN + response.len());
                    w.append_u32(0);
                    w.append_bytes(&response);
                    w.patch_u32(0, LAST_FRAGMENT_BIT | response.len() as u32);
                    stream.write_all(w.as_slice()).await?;
                }
            }
            buf.drain(..RECORD_MARK_LEN + frame_len);
        }

        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&read_buf[..n]);
    }
}

/// Parses the leading record-mark header, returning the fragment length
/// once the full record is buffered. `Err` signals a framing violation the
/// connection must be dropped for (no last-fragment bit, or an oversized
/// record); `Ok(None)` means "not enough bytes yet, keep reading".
fn record_mark(buf: &[u8]) -> std::io::Result<Option<usize>> {
    if buf.len() < RECORD_MARK_LEN {
        return Ok(None);
    }
    let hdr = u32::from_be_bytes(buf[0..RECORD_MARK_LEN].try_into().unwrap());
    if hdr & LAST_FRAGMENT_BIT == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "fragmented TCP records are not supported",
        ));
    }
    let len = (hdr & LENGTH_MASK) as usize;
    if len > MAX_RECORD_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "TCP record exceeds maximum length",
        ));
    }
    if buf.len() < RECORD_MARK_LEN + len {
        return Ok(None);
    }
    Ok(Some(len))
}
