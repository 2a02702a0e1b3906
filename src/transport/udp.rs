//! UDP datagram loop (spec §4.3).

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{trace, warn};

use crate::rpc::router::Router;

use super::UDP_BUFFER_LEN;

/// Runs forever, reading one datagram at a time into a reusable buffer and
/// handing `(bytes, remote_addr)` to `router`. A non-empty reply is sent
/// back to the sender; a dropped (malformed) message produces no reply and
/// does not interrupt the loop.
pub async fn serve(socket: UdpSocket, router: Arc<Router>) -> std::io::Result<()> {
    let local = socket.local_addr()?;
    let mut buf = vec![0u8; UDP_BUFFER_LEN];
    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%local, %err, "udp recv failed");
                continue;
            }
        };
        trace!(%local, %sender, len, "udp datagram received");
        let Some(response) = router.dispatch(sender, &buf[..len]).await else {
            continue;
        };
        if response.is_empty() {
            continue;
        }
        if let Err(err) = socket.send_to(&response, sender).await {
            warn!(%local, %sender, %err, "udp reply send failed");
        }
    }
}
