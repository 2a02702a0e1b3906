//! NFS Mamont - a user-space NFSv3 server, together with its companion
//! MOUNT (v3) and PORTMAP (v2) protocols (RFC 1813, RFC 1813 §5.0, RFC
//! 1833 §3).
//!
//! The protocol stack ([`buffer`], [`xdr`], [`rpc`], [`portmap`],
//! [`mount`], [`nfs3`]) is transport-agnostic; [`transport`] wires it to
//! UDP and TCP sockets. [`vfs`] is the host filesystem adapter interface
//! callers implement to plug in a concrete backing store. [`run_server`]
//! assembles all of the above into the CLI-facing entry point.

pub mod buffer;
pub mod config;
pub mod error;
pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod rpc;
pub mod transport;
pub mod vfs;
pub mod xdr;

use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

use config::Settings;
use error::{Error, Result};
use mount::alias::AliasResolver;
use mount::cache::MountCache;
use rpc::router::Router;
use vfs::Vfs;

/// Everything [`run_server`] needs beyond the resolved [`Settings`]: the
/// concrete filesystem adapter and, for tests, an injected alias source.
pub struct Server {
    pub settings: Settings,
    pub vfs: Arc<dyn Vfs>,
}

impl Server {
    pub fn new(settings: Settings, vfs: Arc<dyn Vfs>) -> Self {
        Self { settings, vfs }
    }

    /// Builds the shared [`Router`] with PORTMAP, MOUNT, and NFSv3 all
    /// registered against it (spec §4.4: "router carries no per-call
    /// state; all state is in the called program"), loading the mount
    /// cache and path-list file as a side effect.
    async fn build(&self) -> Result<(Arc<Router>, Arc<MountCache>)> {
        let aliases = Arc::new(AliasResolver::new());
        config::load_path_list(&self.settings, &aliases, |_path| true)?;

        let cache = Arc::new(match std::fs::read(&self.settings.cache) {
            Ok(bytes) => MountCache::load(&bytes, self.vfs.as_ref())
                .await
                .map_err(|_| Error::Cache("failed to restore mount cache".into()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.settings.cache.display(), "no mount cache found, starting empty");
                MountCache::new()
            }
            Err(err) => return Err(err.into()),
        });

        let portmap_table =
            Arc::new(portmap::PortmapTable::with_defaults(
                self.settings.nfs_port,
                self.settings.mount_port,
                self.settings.portmap_port,
            ));

        let mut router = Router::new();
        portmap::register(&mut router, portmap_table);
        mount::register(&mut router, cache.clone(), aliases, self.vfs.clone());
        let nfs_ctx = Arc::new(nfs3::Context::new(cache.clone(), self.vfs.clone()));
        nfs3::register(&mut router, nfs_ctx);

        Ok((Arc::new(router), cache))
    }

    /// Saves the mount cache to the configured path (spec §4.7: "persistence
    /// is by explicit save at shutdown").
    fn save_cache(&self, cache: &MountCache) -> Result<()> {
        std::fs::write(&self.settings.cache, cache.save())?;
        info!(path = %self.settings.cache.display(), "mount cache saved");
        Ok(())
    }
}

/// Starts the three listeners (PORTMAP on `portmap_port`, MOUNT on
/// `mount_port`, NFS on `nfs_port`, each over both UDP and TCP — spec §6)
/// and blocks until `shutdown` resolves. Intended to be driven by the CLI's
/// stdin "quit"/"q" loop (spec §6 "CLI surface"); callers that just want a
/// server running forever can pass `std::future::pending()`.
pub async fn run_server(server: Server, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let (router, cache) = server.build().await?;

    let portmap_udp = UdpSocket::bind(("0.0.0.0", server.settings.portmap_port)).await?;
    let portmap_tcp = TcpListener::bind(("0.0.0.0", server.settings.portmap_port)).await?;
    let mount_udp = UdpSocket::bind(("0.0.0.0", server.settings.mount_port)).await?;
    let mount_tcp = TcpListener::bind(("0.0.0.0", server.settings.mount_port)).await?;
    let nfs_udp = UdpSocket::bind(("0.0.0.0", server.settings.nfs_port)).await?;
    let nfs_tcp = TcpListener::bind(("0.0.0.0", server.settings.nfs_port)).await?;

    info!(
        portmap = server.settings.portmap_port,
        mount = server.settings.mount_port,
        nfs = server.settings.nfs_port,
        "nfs-mamontd listening"
    );

    let udp_tasks = [
        tokio::spawn(transport::udp::serve(portmap_udp, router.clone())),
        tokio::spawn(transport::udp::serve(mount_udp, router.clone())),
        tokio::spawn(transport::udp::serve(nfs_udp, router.clone())),
    ];
    let tcp_tasks = [
        tokio::spawn(transport::tcp::serve(portmap_tcp, router.clone())),
        tokio::spawn(transport::tcp::serve(mount_tcp, router.clone())),
        tokio::spawn(transport::tcp::serve(nfs_tcp, router.clone())),
    ];

    shutdown.await;
    info!("shutdown requested, stopping listeners");

    for task in udp_tasks.into_iter().chain(tcp_tasks) {
        task.abort();
    }

    server.save_cache(&cache)?;
    Ok(())
}
