//! putfile
//!
//! Upload a single local file to a remote server over SFTP, FTP or SMB.
//!
//! ## Features
//! - One binary for all three protocols, picked per invocation
//! - Destination directories created on demand
//! - Base64, hex or plain password arguments
//! - SHA-256 of the uploaded bytes and optional remote size check
//! - Progress bar for transfers
//!
//! ## Usage
//!
//! ```bash
//! # SFTP, base64 password
//! putfile sftp 10.30.12.39 822 ext-vtt-soc aHVudGVyMg== /ThreatHunting ./myfile.txt
//!
//! # FTP, hex password, check the size afterwards
//! putfile --encoding hex --verify ftp ftp.example.com 21 alice 68756e74657232 incoming ./report.csv
//!
//! # SMB, first path component is the share
//! putfile smb fileserver 445 alice aHVudGVyMg== /public/drops ./image.iso
//! ```

pub mod client;
pub mod credential;
pub mod ftp;
pub mod protocol;
pub mod remote_path;
pub mod sftp;
#[cfg(feature = "smb")]
pub mod smb;

pub use client::{Client, UploadOptions, UploadReport, UploadRequest, Uploader};
pub use credential::{Encoding, Secret};
pub use protocol::{Protocol, UploadError};
pub use remote_path::RemoteTarget;
