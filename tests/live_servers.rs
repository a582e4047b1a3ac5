//! Round trips against real servers.
//!
//! Ignored by default. Point one of these variables at a scratch account and
//! run `cargo test -- --ignored`:
//!
//! ```text
//! PUTFILE_TEST_SFTP=host:port:user:/dest/dir:password
//! PUTFILE_TEST_FTP=host:port:user:/dest/dir:password
//! PUTFILE_TEST_SMB=host:port:user:share/dest/dir:password
//! ```
//!
//! The password is the last field, so it may contain `:`.

use std::env;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use putfile::credential::Secret;
use putfile::remote_path::join;
use putfile::{Client, Protocol, UploadOptions, UploadReport, UploadRequest};

struct Server {
    host: String,
    port: u16,
    user: String,
    dest: String,
    password: String,
}

fn server(var: &str) -> Option<Server> {
    let value = env::var(var).ok()?;
    let mut fields = value.splitn(5, ':');
    let mut next = || fields.next().map(str::to_string);
    Some(Server {
        host: next()?,
        port: next()?.parse().ok()?,
        user: next()?,
        dest: next()?,
        password: next()?,
    })
}

/// A file whose bytes are not all the same, named after the test
fn sample(dir: &Path, name: &str) -> (std::path::PathBuf, Vec<u8>) {
    let contents: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();
    let path = dir.join(name);
    std::fs::write(&path, &contents).unwrap();
    (path, contents)
}

fn upload(protocol: Protocol, server: &Server, local: &Path) -> UploadReport {
    let request = UploadRequest {
        protocol,
        host: server.host.clone(),
        port: server.port,
        user: server.user.clone(),
        password: Secret::new(server.password.clone()),
        dest_path: server.dest.clone(),
        local_path: local.to_path_buf(),
        options: UploadOptions {
            connect_timeout: Duration::from_secs(10),
            verify: true,
            show_progress: false,
            ..Default::default()
        },
    };
    Client::new(request).upload().unwrap()
}

#[test]
#[ignore = "needs PUTFILE_TEST_SFTP"]
fn sftp_round_trip() {
    let Some(server) = server("PUTFILE_TEST_SFTP") else {
        return;
    };
    let tmp = tempfile::tempdir().unwrap();
    let (local, contents) = sample(tmp.path(), "putfile-sftp.bin");

    let report = upload(Protocol::Sftp, &server, &local);
    assert_eq!(report.remote_path, join(&server.dest, "putfile-sftp.bin"));
    assert_eq!(report.bytes, contents.len() as u64);
    assert!(report.verified);

    let tcp = std::net::TcpStream::connect((server.host.as_str(), server.port)).unwrap();
    let mut session = ssh2::Session::new().unwrap();
    session.set_tcp_stream(tcp);
    session.handshake().unwrap();
    session
        .userauth_password(&server.user, &server.password)
        .unwrap();
    let sftp = session.sftp().unwrap();

    let mut fetched = Vec::new();
    sftp.open(Path::new(&report.remote_path))
        .unwrap()
        .read_to_end(&mut fetched)
        .unwrap();
    assert_eq!(fetched, contents);
    sftp.unlink(Path::new(&report.remote_path)).unwrap();
}

#[test]
#[ignore = "needs PUTFILE_TEST_FTP"]
fn ftp_round_trip() {
    let Some(server) = server("PUTFILE_TEST_FTP") else {
        return;
    };
    let tmp = tempfile::tempdir().unwrap();
    let (local, contents) = sample(tmp.path(), "putfile-ftp.bin");

    let report = upload(Protocol::Ftp, &server, &local);
    assert_eq!(report.remote_path, join(&server.dest, "putfile-ftp.bin"));
    assert_eq!(report.bytes, contents.len() as u64);
    assert!(report.verified);

    let mut ftp =
        suppaftp::FtpStream::connect((server.host.as_str(), server.port)).unwrap();
    ftp.login(server.user.as_str(), server.password.as_str())
        .unwrap();
    ftp.transfer_type(suppaftp::types::FileType::Binary)
        .unwrap();
    let fetched = ftp.retr_as_buffer(&report.remote_path).unwrap().into_inner();
    assert_eq!(fetched, contents);
    ftp.rm(&report.remote_path).unwrap();
    ftp.quit().unwrap();
}

#[cfg(feature = "smb")]
#[test]
#[ignore = "needs PUTFILE_TEST_SMB"]
fn smb_round_trip_into_new_directory() {
    let Some(mut server) = server("PUTFILE_TEST_SMB") else {
        return;
    };
    // Nested directory that does not exist yet, so every level is created
    let nonce = std::process::id();
    server.dest = format!("{}/putfile-{}/nested", server.dest.trim_end_matches('/'), nonce);

    let tmp = tempfile::tempdir().unwrap();
    let (local, contents) = sample(tmp.path(), "putfile-smb.bin");

    let report = upload(Protocol::Smb, &server, &local);
    assert_eq!(report.bytes, contents.len() as u64);
    assert!(report.verified);

    let location = putfile::remote_path::SmbLocation::split(&server.dest).unwrap();
    let client = pavao::SmbClient::new(
        pavao::SmbCredentials::default()
            .server(format!("smb://{}:{}", server.host, server.port))
            .share(format!("/{}", location.share))
            .username(server.user.as_str())
            .password(server.password.as_str()),
        pavao::SmbOptions::default().one_share_per_server(true),
    )
    .unwrap();
    let remote = format!("/{}", location.file_path("putfile-smb.bin"));

    let mut fetched = Vec::new();
    client
        .open_with(remote.as_str(), pavao::SmbOpenOptions::default().read(true))
        .unwrap()
        .read_to_end(&mut fetched)
        .unwrap();
    assert_eq!(fetched, contents);
    client.unlink(remote.as_str()).unwrap();
}
