//! Startup configuration (spec §6): `clap`-derived CLI flags layered over
//! an optional TOML file, plus the path-list file format the alias
//! resolver is seeded from.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::Error;
use crate::mount::alias::AliasResolver;

const DEFAULT_CACHE_PATH: &str = "./mount_cache";
const DEFAULT_PORTMAP_PORT: u16 = 111;
const DEFAULT_MOUNT_PORT: u16 = 1058;
const DEFAULT_NFS_PORT: u16 = 2049;

/// Raw CLI flags (spec §6 "CLI surface"). Every field is optional here so a
/// TOML file can supply it instead; [`Settings::resolve`] applies the
/// documented precedence (CLI wins over file, file wins over built-in
/// defaults).
#[derive(Parser, Debug, Default)]
#[command(name = "nfs-mamontd", about = "A user-space NFSv3 server")]
pub struct Cli {
    /// Path-list file of export roots, one per line (spec §6).
    #[arg(long)]
    pub paths: Option<PathBuf>,

    /// Mount cache file (spec §4.7). Defaults to `./mount_cache`.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Default uid attributed to files the adapter cannot resolve one for.
    #[arg(long)]
    pub uid: Option<u32>,

    /// Default gid attributed to files the adapter cannot resolve one for.
    #[arg(long)]
    pub gid: Option<u32>,

    #[arg(long = "portmap-port")]
    pub portmap_port: Option<u16>,

    #[arg(long = "mount-port")]
    pub mount_port: Option<u16>,

    #[arg(long = "nfs-port")]
    pub nfs_port: Option<u16>,

    /// Optional TOML file of the same settings; CLI flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// The subset of settings a TOML config file may supply (spec §4
/// "Configuration": "listen addresses/ports, default uid/gid, cache file
/// path").
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    paths: Option<PathBuf>,
    cache: Option<PathBuf>,
    uid: Option<u32>,
    gid: Option<u32>,
    portmap_port: Option<u16>,
    mount_port: Option<u16>,
    nfs_port: Option<u16>,
}

/// Fully resolved server settings: every field has a concrete value.
#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Option<PathBuf>,
    pub cache: PathBuf,
    pub uid: u32,
    pub gid: u32,
    pub portmap_port: u16,
    pub mount_port: u16,
    pub nfs_port: u16,
}

impl Settings {
    /// Applies CLI-over-file-over-defaults precedence (spec §4
    /// "Configuration").
    pub fn resolve(cli: Cli) -> Result<Self, Error> {
        let file = match &cli.config {
            Some(path) => load_file_settings(path)?,
            None => FileSettings::default(),
        };

        Ok(Self {
            paths: cli.paths.or(file.paths),
            cache: cli.cache.or(file.cache).unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            uid: cli.uid.or(file.uid).unwrap_or(0),
            gid: cli.gid.or(file.gid).unwrap_or(0),
            portmap_port: cli.portmap_port.or(file.portmap_port).unwrap_or(DEFAULT_PORTMAP_PORT),
            mount_port: cli.mount_port.or(file.mount_port).unwrap_or(DEFAULT_MOUNT_PORT),
            nfs_port: cli.nfs_port.or(file.nfs_port).unwrap_or(DEFAULT_NFS_PORT),
        })
    }
}

fn load_file_settings(path: &Path) -> Result<FileSettings, Error> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| Error::Config(err.to_string()))
}

/// Parses the path-list file format (spec §6): UTF-8 text, one export root
/// per line, `#` starts a comment, surrounding whitespace trimmed, blank
/// lines skipped. The alias for each entry is left unset so
/// [`AliasResolver::set`] synthesizes it from the host path, matching the
/// original tool's export-list behavior.
pub fn parse_path_list(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|host_path| (host_path.to_string(), String::new()))
        .collect()
}

/// Loads the path-list file (if configured) and installs its entries under
/// a fresh alias source. Missing files are treated as "no static exports"
/// rather than a startup error — the server can still be configured purely
/// through a live config-watcher in front of [`AliasResolver::set`].
pub fn load_path_list(
    settings: &Settings,
    aliases: &AliasResolver,
    host_openable: impl FnMut(&str) -> bool,
) -> Result<(), Error> {
    let Some(path) = &settings.paths else { return Ok(()) };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "path-list file not found, starting with no static exports");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let entries = parse_path_list(&text);
    let source = aliases.new_source();
    let accepted = aliases.set(source, entries, host_openable);
    tracing::info!(count = accepted.len(), path = %path.display(), "loaded path-list file");
    Ok(())
}
