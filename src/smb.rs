//! SMB backend
//!
//! Uses `pavao`, a binding to libsmbclient. The first component of the
//! destination is the share; the rest is a directory inside it.

use std::io::{self, Read};

use pavao::{SmbClient, SmbCredentials, SmbMode, SmbOpenOptions, SmbOptions};
use tracing::{debug, info};

use crate::client::{UploadRequest, Uploader};
use crate::protocol::{Protocol, UploadError};
use crate::remote_path::{ancestors, RemoteTarget, SmbLocation};

const DIR_MODE: u32 = 0o755;

pub struct SmbUploader {
    client: SmbClient,
    location: SmbLocation,
}

/// libsmbclient paths are absolute within the mounted share
fn share_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

impl SmbUploader {
    /// Connect to the server and mount the share named by the destination
    pub fn connect(request: &UploadRequest) -> Result<Self, UploadError> {
        let location = SmbLocation::split(&request.dest_path)?;
        debug!("Share {}, directory {}", location.share, location.relative);

        let credentials = SmbCredentials::default()
            .server(format!("smb://{}", request.address()))
            .share(format!("/{}", location.share))
            .username(request.user.as_str())
            .password(request.password.expose())
            .workgroup(request.options.workgroup.as_str());

        let client = SmbClient::new(
            credentials,
            SmbOptions::default()
                .case_sensitive(true)
                .one_share_per_server(true),
        )
        .map_err(|e| UploadError::Connect {
            protocol: Protocol::Smb,
            address: request.address(),
            source: e.into(),
        })?;

        // libsmbclient connects lazily; touching the share root surfaces
        // authentication and mount failures here rather than mid-upload
        client.stat("/").map_err(|e| UploadError::Mount {
            share: location.share.clone(),
            source: e.into(),
        })?;

        info!("🔐 Mounted SMB share {}", location.share);

        Ok(Self { client, location })
    }

    fn exists(&self, path: &str) -> bool {
        self.client.stat(share_path(path).as_str()).is_ok()
    }
}

impl Uploader for SmbUploader {
    fn ensure_dir(&mut self, _target: &RemoteTarget) -> Result<(), UploadError> {
        if self.location.is_share_root() {
            return Ok(());
        }

        for dir in ancestors(&self.location.relative) {
            if self.exists(&dir) {
                continue;
            }
            debug!("Creating directory {}", dir);
            if let Err(e) = self.client.mkdir(share_path(&dir).as_str(), SmbMode::from(DIR_MODE)) {
                if !self.exists(&dir) {
                    return Err(UploadError::CreateDir {
                        path: self.location.relative.clone(),
                        source: e.into(),
                    });
                }
            }
        }
        Ok(())
    }

    fn put(&mut self, target: &RemoteTarget, source: &mut dyn Read) -> Result<u64, UploadError> {
        let path = share_path(&self.location.file_path(&target.file_name));

        let mut remote = self
            .client
            .open_with(
                path.as_str(),
                SmbOpenOptions::default().create(true).write(true).truncate(true),
            )
            .map_err(|e| UploadError::CreateFile {
                protocol: Protocol::Smb,
                path: path.clone(),
                source: e.into(),
            })?;

        io::copy(source, &mut remote).map_err(|e| UploadError::Transfer {
            protocol: Protocol::Smb,
            source: e.into(),
        })
    }

    fn remote_size(&mut self, target: &RemoteTarget) -> Result<u64, UploadError> {
        let path = share_path(&self.location.file_path(&target.file_name));
        self.client
            .stat(path.as_str())
            .map(|stat| stat.size)
            .map_err(|e| UploadError::RemoteSize {
                protocol: Protocol::Smb,
                path,
                source: e.into(),
            })
    }

    fn close(&mut self) -> Result<(), UploadError> {
        // The libsmbclient context is torn down when the client drops
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_path() {
        assert_eq!(share_path("reports/2024"), "/reports/2024");
        assert_eq!(share_path("/a.txt"), "/a.txt");
        assert_eq!(share_path("a.txt"), "/a.txt");
    }
}
