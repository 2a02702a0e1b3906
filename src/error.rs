//! Crate-wide ambient error type.
//!
//! This type covers the things that can fail while standing the server up:
//! loading the path-list file, parsing the TOML config, and restoring the
//! mount cache. Procedure-level failures are not routed through it — they
//! are mapped directly from [`crate::vfs::NfsError`] to an NFSv3 status
//! code at the procedure boundary (see [`crate::nfs3::attr::nfsstat3`]).

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Config(String),
    Cache(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Cache(msg) => write!(f, "mount cache error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
