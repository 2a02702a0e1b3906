//! Runnable example wiring [`ShadowFS`] (a real, file-backed `Vfs`) into
//! `nfs_mamont::run_server`. This is the repo's concrete demonstration of
//! the CLI surface described in spec §6 — the protocol core itself stays
//! agnostic of any particular host filesystem adapter.
//!
//! ```text
//! cargo run --example nfs-mamontd -- --paths exports.txt --root /srv/demo
//! ```

mod fs;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use fs::ShadowFS;
use nfs_mamont::config::{Cli, Settings};

/// Extends the crate's [`Cli`] flags with the one thing a concrete adapter
/// needs that the protocol core has no opinion about: where its files live
/// on disk.
#[derive(Parser, Debug)]
#[command(name = "nfs-mamontd", about = "A user-space NFSv3 server (ShadowFS demo backend)")]
struct DemoCli {
    #[command(flatten)]
    cli: Cli,

    /// Directory ShadowFS serves files from.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = DemoCli::parse();
    let settings = Settings::resolve(args.cli)?;
    let vfs: Arc<dyn nfs_mamont::vfs::Vfs> = Arc::new(ShadowFS::new(args.root));

    let server = nfs_mamont::Server::new(settings, vfs);

    let shutdown = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim().to_ascii_lowercase();
            if trimmed == "quit" || trimmed == "q" {
                break;
            }
        }
    };

    nfs_mamont::run_server(server, shutdown).await?;
    Ok(())
}
