//! Protocol Definition Module
//!
//! This module defines what every transfer backend shares:
//! - The set of supported transfer protocols
//! - The error type returned by every upload step
//! - Integrity accounting using SHA-256 hashes
//!
//! ## Upload Overview
//!
//! Every backend walks the same sequence against its server:
//!
//! ```text
//! Client                                 Server
//!   |                                      |
//!   |-- connect(host, port) -------------->|
//!   |-- authenticate(user, password) ----->|
//!   |<------------------------- accepted --|
//!   |                                      |
//!   |-- ensure destination directory ----->|
//!   |-- create remote file --------------->|
//!   |-- [File Data] ---------------------->|
//!   |-- close ---------------------------->|
//! ```
//!
//! Framing, encryption and authentication happen inside the protocol
//! libraries; nothing here touches the wire directly.

use std::fmt;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Chunk size for local file reads (64 KB)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Boxed library error carried as the source of an [`UploadError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Transfer protocol selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Sftp,
    Ftp,
    Smb,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Sftp => "SFTP",
            Protocol::Ftp => "FTP",
            Protocol::Smb => "SMB",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upload errors
///
/// One variant per failure site. The underlying library error is kept as the
/// source so the whole chain is printed when the process exits.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File does not exist: {}", .0.display())]
    LocalFileMissing(PathBuf),

    #[error("Cannot upload a directory: {}", .0.display())]
    LocalIsDirectory(PathBuf),

    #[error("Failed to open local file {}", .path.display())]
    OpenLocal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination path is empty or invalid: {0}")]
    InvalidDestination(String),

    #[error("Failed to connect to {protocol} server at {address}")]
    Connect {
        protocol: Protocol,
        address: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to login to {protocol} server as {user}")]
    Login {
        protocol: Protocol,
        user: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create {protocol} client")]
    Session {
        protocol: Protocol,
        #[source]
        source: BoxError,
    },

    #[error("Failed to mount SMB share {share}")]
    Mount {
        share: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create destination directory {path}")]
    CreateDir {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to change to destination directory {path}")]
    ChangeDir {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create file {path} on {protocol} server")]
    CreateFile {
        protocol: Protocol,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to upload file to {protocol} server")]
    Transfer {
        protocol: Protocol,
        #[source]
        source: BoxError,
    },

    #[error("Failed to read size of {path} on {protocol} server")]
    RemoteSize {
        protocol: Protocol,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to close {protocol} session")]
    Disconnect {
        protocol: Protocol,
        #[source]
        source: BoxError,
    },

    #[error("Size mismatch: local {local} bytes, remote {remote} bytes")]
    SizeMismatch { local: u64, remote: u64 },

    #[error("{0} support was not compiled into this binary")]
    Unsupported(Protocol),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Streaming hash calculator for uploaded bytes
pub struct StreamingHasher {
    hasher: Sha256,
    bytes_processed: u64,
}

impl StreamingHasher {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes_processed: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes_processed += data.len() as u64;
    }

    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }
}

impl Default for StreamingHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader adapter that hashes everything read through it
pub struct HashingReader<R> {
    inner: R,
    hasher: StreamingHasher,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: StreamingHasher::new(),
        }
    }

    /// Consume the reader, returning the byte count and hex digest
    pub fn finish(self) -> (u64, String) {
        let bytes = self.hasher.bytes_processed();
        (bytes, self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Calculate SHA-256 hash of data
#[cfg(test)]
pub(crate) fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `host:port` as shown in messages
pub fn display_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Resolve `host:port` to every candidate socket address
pub fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {}", display_address(host, port)),
        ));
    }
    Ok(addrs)
}

/// Open a TCP connection, trying each resolved address in turn
pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in resolve(host, port)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable)))
}
