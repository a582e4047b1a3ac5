//! Upload Client Module
//!
//! This module drives a single upload from start to finish:
//! - Checks and opens the local file
//! - Works out where the file lands on the server
//! - Connects through the selected protocol backend
//! - Streams the file while hashing it, with a progress bar
//! - Optionally verifies the remote size afterwards
//!
//! ## Backend Seam
//!
//! ```text
//!   Client::upload
//!        │
//!        ▼
//!   connect(protocol) ──► SftpUploader | FtpUploader | SmbUploader
//!        │
//!        ▼
//!   transfer(&mut dyn Uploader)
//!     ensure_dir → put → [remote_size] → close
//! ```
//!
//! Everything protocol specific lives behind [`Uploader`], so [`transfer`]
//! can be exercised without a server.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credential::Secret;
use crate::ftp::FtpUploader;
use crate::protocol::{
    display_address, HashingReader, Protocol, UploadError, CHUNK_SIZE,
    DEFAULT_CONNECT_TIMEOUT_SECS,
};
use crate::remote_path::RemoteTarget;
use crate::sftp::SftpUploader;

/// One protocol session able to place a file on a server
pub trait Uploader {
    /// Make sure the target directory exists (and, where the protocol has a
    /// working directory, that it is the current one)
    fn ensure_dir(&mut self, target: &RemoteTarget) -> Result<(), UploadError>;

    /// Create the remote file and copy `source` into it, returning the
    /// number of bytes written
    fn put(&mut self, target: &RemoteTarget, source: &mut dyn Read) -> Result<u64, UploadError>;

    /// Size of the remote file as reported by the server
    fn remote_size(&mut self, target: &RemoteTarget) -> Result<u64, UploadError>;

    /// End the session politely
    fn close(&mut self) -> Result<(), UploadError>;
}

/// Tuning knobs that do not change what gets uploaded
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// TCP connect timeout (SFTP and FTP)
    pub connect_timeout: Duration,
    /// SMB workgroup / domain
    pub workgroup: String,
    /// Compare the remote size with the local byte count after the copy
    pub verify: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            workgroup: "WORKGROUP".to_string(),
            verify: false,
            show_progress: true,
        }
    }
}

/// Everything needed for one upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    /// Remote destination directory (`share/dir` for SMB)
    pub dest_path: String,
    pub local_path: PathBuf,
    pub options: UploadOptions,
}

impl UploadRequest {
    pub fn address(&self) -> String {
        display_address(&self.host, self.port)
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub remote_path: String,
    pub bytes: u64,
    pub sha256: String,
    pub verified: bool,
}

/// A local file checked and opened for upload
pub struct LocalFile {
    pub path: PathBuf,
    pub size: u64,
    file: File,
}

impl LocalFile {
    pub fn open(path: &Path) -> Result<Self, UploadError> {
        if !path.exists() {
            return Err(UploadError::LocalFileMissing(path.to_path_buf()));
        }

        let metadata = fs::metadata(path).map_err(|source| UploadError::OpenLocal {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(UploadError::LocalIsDirectory(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| UploadError::OpenLocal {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            file,
        })
    }
}

/// Upload client
pub struct Client {
    request: UploadRequest,
}

impl Client {
    pub fn new(request: UploadRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &UploadRequest {
        &self.request
    }

    /// Where the file will land on the server
    pub fn target(&self) -> Result<RemoteTarget, UploadError> {
        RemoteTarget::resolve(&self.request.dest_path, &self.request.local_path)
    }

    /// Check the local file and work out the remote target without
    /// touching the network
    pub fn prepare(&self) -> Result<PreparedUpload, UploadError> {
        let local = LocalFile::open(&self.request.local_path)?;
        let target = self.target()?;
        Ok(PreparedUpload { local, target })
    }

    /// Run the whole upload
    pub fn upload(&self) -> Result<UploadReport, UploadError> {
        let prepared = self.prepare()?;
        self.send(prepared)
    }

    /// Connect and push a prepared upload
    pub fn send(&self, prepared: PreparedUpload) -> Result<UploadReport, UploadError> {
        let PreparedUpload { local, target } = prepared;

        debug!(
            "Uploading {:?} ({} bytes) to {}",
            local.path, local.size, target.full_path
        );

        let mut uploader = connect(&self.request)?;
        let outcome = transfer(uploader.as_mut(), &target, local, &self.request.options);

        // Close even after a failed copy, but report the copy error first
        let closed = uploader.close();
        let (bytes, sha256, verified) = outcome?;
        if let Err(e) = closed {
            warn!("Failed to close {} session cleanly: {}", self.request.protocol, e);
        }

        Ok(UploadReport {
            protocol: self.request.protocol,
            host: self.request.host.clone(),
            port: self.request.port,
            remote_path: target.full_path,
            bytes,
            sha256,
            verified,
        })
    }
}

/// A checked local file paired with its remote destination
pub struct PreparedUpload {
    local: LocalFile,
    target: RemoteTarget,
}

impl PreparedUpload {
    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }
}

/// Open an authenticated session for the requested protocol
pub fn connect(request: &UploadRequest) -> Result<Box<dyn Uploader>, UploadError> {
    info!(
        "🔗 Connecting to {} server {}...",
        request.protocol,
        request.address()
    );

    match request.protocol {
        Protocol::Sftp => Ok(Box::new(SftpUploader::connect(request)?)),
        Protocol::Ftp => Ok(Box::new(FtpUploader::connect(request)?)),
        #[cfg(feature = "smb")]
        Protocol::Smb => Ok(Box::new(crate::smb::SmbUploader::connect(request)?)),
        #[cfg(not(feature = "smb"))]
        Protocol::Smb => Err(UploadError::Unsupported(Protocol::Smb)),
    }
}

/// Copy `local` to `target` through an open session.
///
/// Returns the number of bytes read from the local file, their SHA-256 and
/// whether the remote size was checked.
pub fn transfer(
    uploader: &mut dyn Uploader,
    target: &RemoteTarget,
    local: LocalFile,
    options: &UploadOptions,
) -> Result<(u64, String, bool), UploadError> {
    uploader.ensure_dir(target)?;

    let pb = if options.show_progress {
        create_progress_bar(local.size)
    } else {
        ProgressBar::hidden()
    };
    pb.set_message("Uploading");

    let buffered = BufReader::with_capacity(CHUNK_SIZE, local.file);
    let mut reader = HashingReader::new(pb.wrap_read(buffered));

    let written = match uploader.put(target, &mut reader) {
        Ok(written) => written,
        Err(e) => {
            pb.abandon_with_message("Upload failed");
            return Err(e);
        }
    };
    pb.finish_with_message("Upload complete");

    let (bytes, sha256) = reader.finish();
    if written != bytes {
        warn!(
            "Backend reported {} bytes written but {} were read",
            written, bytes
        );
    }
    info!("  SHA-256: {}", sha256);

    let verified = if options.verify {
        let remote = uploader.remote_size(target)?;
        if remote != bytes {
            return Err(UploadError::SizeMismatch {
                local: bytes,
                remote,
            });
        }
        info!("✅ Remote size verified: {}", format_size(remote));
        true
    } else {
        false
    };

    Ok((bytes, sha256, verified))
}

/// Create progress bar for transfers
fn create_progress_bar(total_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format file size for display
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}
