//! FTP backend
//!
//! Plain FTP through `suppaftp`, passive mode, binary transfers. The file is
//! stored under its base name after changing into the destination directory.

use std::io::Read;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::{debug, info};

use crate::client::{UploadRequest, Uploader};
use crate::protocol::{resolve, BoxError, Protocol, UploadError};
use crate::remote_path::{ancestors, RemoteTarget};

pub struct FtpUploader {
    stream: FtpStream,
}

impl FtpUploader {
    /// Connect and log in
    pub fn connect(request: &UploadRequest) -> Result<Self, UploadError> {
        let connect_err = |source: BoxError| UploadError::Connect {
            protocol: Protocol::Ftp,
            address: request.address(),
            source,
        };

        let mut last_err: Option<FtpError> = None;
        let mut connected = None;
        for addr in resolve(&request.host, request.port).map_err(|e| connect_err(e.into()))? {
            match FtpStream::connect_timeout(addr, request.options.connect_timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => {
                    debug!("FTP connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        let mut stream = match (connected, last_err) {
            (Some(stream), _) => stream,
            (None, Some(e)) => return Err(connect_err(e.into())),
            (None, None) => return Err(connect_err("no address to connect to".into())),
        };

        if let Some(welcome) = stream.get_welcome_msg() {
            debug!("Server says: {}", welcome.trim_end());
        }

        stream
            .login(request.user.as_str(), request.password.expose())
            .map_err(|e| UploadError::Login {
                protocol: Protocol::Ftp,
                user: request.user.clone(),
                source: e.into(),
            })?;

        info!("🔐 Logged in to FTP server");

        stream.set_mode(Mode::Passive);
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| UploadError::Session {
                protocol: Protocol::Ftp,
                source: e.into(),
            })?;

        Ok(Self { stream })
    }
}

impl Uploader for FtpUploader {
    fn ensure_dir(&mut self, target: &RemoteTarget) -> Result<(), UploadError> {
        if target.is_current_dir() || self.stream.cwd(&target.dir).is_ok() {
            return Ok(());
        }

        let mut mkdir_failure = None;
        for dir in ancestors(&target.dir) {
            debug!("Creating directory {}", dir);
            // Fails for directories that already exist; only the final cwd decides
            if let Err(e) = self.stream.mkdir(&dir) {
                mkdir_failure = Some((dir, e));
            }
        }

        self.stream.cwd(&target.dir).map_err(|e| match mkdir_failure {
            Some((path, mkdir_err)) => UploadError::CreateDir {
                path,
                source: mkdir_err.into(),
            },
            None => UploadError::ChangeDir {
                path: target.dir.clone(),
                source: e.into(),
            },
        })
    }

    fn put(&mut self, target: &RemoteTarget, mut source: &mut dyn Read) -> Result<u64, UploadError> {
        self.stream
            .put_file(&target.file_name, &mut source)
            .map_err(|e| UploadError::Transfer {
                protocol: Protocol::Ftp,
                source: e.into(),
            })
    }

    fn remote_size(&mut self, target: &RemoteTarget) -> Result<u64, UploadError> {
        self.stream
            .size(&target.file_name)
            .map(|size| size as u64)
            .map_err(|e| UploadError::RemoteSize {
                protocol: Protocol::Ftp,
                path: target.full_path.clone(),
                source: e.into(),
            })
    }

    fn close(&mut self) -> Result<(), UploadError> {
        self.stream.quit().map_err(|e| UploadError::Disconnect {
            protocol: Protocol::Ftp,
            source: e.into(),
        })
    }
}
