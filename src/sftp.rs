//! SFTP backend
//!
//! Runs over `ssh2` (libssh2). The server host key is accepted without
//! checking against known hosts; its fingerprint is only logged.

use std::io::{self, Read};
use std::path::Path;

use ssh2::{HashType, Session, Sftp};
use tracing::{debug, info};

use crate::client::{UploadRequest, Uploader};
use crate::protocol::{connect_tcp, BoxError, Protocol, UploadError};
use crate::remote_path::{ancestors, RemoteTarget};

const DIR_MODE: i32 = 0o755;

pub struct SftpUploader {
    session: Session,
    sftp: Sftp,
}

impl SftpUploader {
    /// Connect, handshake, authenticate and open the SFTP subsystem
    pub fn connect(request: &UploadRequest) -> Result<Self, UploadError> {
        let connect_err = |source: BoxError| UploadError::Connect {
            protocol: Protocol::Sftp,
            address: request.address(),
            source,
        };

        let tcp = connect_tcp(&request.host, request.port, request.options.connect_timeout)
            .map_err(|e| connect_err(e.into()))?;

        let mut session = Session::new().map_err(|e| connect_err(e.into()))?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| connect_err(e.into()))?;

        if let Some(hash) = session.host_key_hash(HashType::Sha256) {
            debug!("Host key SHA256:{}", hex::encode(hash));
        }

        session
            .userauth_password(&request.user, request.password.expose())
            .map_err(|e| UploadError::Login {
                protocol: Protocol::Sftp,
                user: request.user.clone(),
                source: e.into(),
            })?;
        if !session.authenticated() {
            return Err(UploadError::Login {
                protocol: Protocol::Sftp,
                user: request.user.clone(),
                source: "server did not accept the password".into(),
            });
        }

        info!("🔐 Connected to SFTP server");

        let sftp = session.sftp().map_err(|e| UploadError::Session {
            protocol: Protocol::Sftp,
            source: e.into(),
        })?;

        Ok(Self { session, sftp })
    }

    fn is_dir(&self, path: &str) -> bool {
        self.sftp
            .stat(Path::new(path))
            .map(|stat| stat.is_dir())
            .unwrap_or(false)
    }
}

impl Uploader for SftpUploader {
    fn ensure_dir(&mut self, target: &RemoteTarget) -> Result<(), UploadError> {
        for dir in ancestors(&target.dir) {
            if self.is_dir(&dir) {
                continue;
            }
            debug!("Creating directory {}", dir);
            if let Err(e) = self.sftp.mkdir(Path::new(&dir), DIR_MODE) {
                if !self.is_dir(&dir) {
                    return Err(UploadError::CreateDir {
                        path: dir,
                        source: e.into(),
                    });
                }
            }
        }
        Ok(())
    }

    fn put(&mut self, target: &RemoteTarget, source: &mut dyn Read) -> Result<u64, UploadError> {
        let mut remote = self
            .sftp
            .create(Path::new(&target.full_path))
            .map_err(|e| UploadError::CreateFile {
                protocol: Protocol::Sftp,
                path: target.full_path.clone(),
                source: e.into(),
            })?;

        let written = io::copy(source, &mut remote).map_err(|e| UploadError::Transfer {
            protocol: Protocol::Sftp,
            source: e.into(),
        })?;

        if let Err(e) = remote.fsync() {
            debug!("fsync of {} not honoured: {}", target.full_path, e);
        }
        remote.close().map_err(|e| UploadError::Transfer {
            protocol: Protocol::Sftp,
            source: e.into(),
        })?;

        Ok(written)
    }

    fn remote_size(&mut self, target: &RemoteTarget) -> Result<u64, UploadError> {
        let err = |source: BoxError| UploadError::RemoteSize {
            protocol: Protocol::Sftp,
            path: target.full_path.clone(),
            source,
        };

        let stat = self
            .sftp
            .stat(Path::new(&target.full_path))
            .map_err(|e| err(e.into()))?;
        stat.size.ok_or_else(|| err("server did not report a size".into()))
    }

    fn close(&mut self) -> Result<(), UploadError> {
        self.session
            .disconnect(None, "upload finished", None)
            .map_err(|e| UploadError::Disconnect {
                protocol: Protocol::Sftp,
                source: e.into(),
            })
    }
}
