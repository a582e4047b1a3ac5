//! putfile - Main Entry Point
//!
//! Parses the command line, decodes the password and hands off to the
//! library for the actual upload.
//!
//! ```text
//!  args ──► decode password ──► check local file ──► "Dest File: ..."
//!                                                        │
//!        "File successfully uploaded to ..." ◄── upload ◄┘
//! ```
//!
//! Every failure ends the process with exit code 1.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use putfile::credential::{self, Encoding};
use putfile::protocol::DEFAULT_CONNECT_TIMEOUT_SECS;
use putfile::{Client, Protocol, UploadOptions, UploadRequest};

/// Upload one file over SFTP, FTP or SMB
///
/// Example: putfile sftp 10.30.12.39 822 ext-vtt-soc aHVudGVyMg== /ThreatHunting ./myfile.txt
#[derive(Parser, Debug)]
#[command(name = "putfile")]
#[command(version)]
#[command(about = "Upload a file over SFTP, FTP or SMB", long_about = None)]
struct Cli {
    /// Transfer protocol
    #[arg(value_enum)]
    mode: Protocol,

    /// Server host name or address
    host: String,

    /// Server port
    port: u16,

    /// User name
    user: String,

    /// Encoded password (see --encoding)
    password: String,

    /// Remote destination directory; for SMB the first component is the share
    dest_path: String,

    /// Local file to upload
    file_path: PathBuf,

    /// How the password argument is encoded
    #[arg(short, long, value_enum, default_value_t = Encoding::Base64, env = "PUTFILE_ENCODING")]
    encoding: Encoding,

    /// Connect timeout in seconds (SFTP and FTP)
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    timeout: u64,

    /// SMB workgroup or domain
    #[arg(long, default_value = "WORKGROUP")]
    workgroup: String,

    /// Check the remote file size after the upload
    #[arg(long)]
    verify: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the upload report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    // Set up logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let password = credential::decode(&cli.password, cli.encoding)
        .context("Invalid password argument")?;
    debug!("Password decoded as {:?}", cli.encoding);

    let request = UploadRequest {
        protocol: cli.mode,
        host: cli.host,
        port: cli.port,
        user: cli.user,
        password,
        dest_path: cli.dest_path,
        local_path: cli.file_path,
        options: UploadOptions {
            connect_timeout: Duration::from_secs(cli.timeout),
            workgroup: cli.workgroup,
            verify: cli.verify,
            show_progress: !cli.no_progress && !cli.json,
        },
    };

    let client = Client::new(request);
    let prepared = client.prepare()?;
    let dest_full_path = prepared.target().full_path.clone();

    if !cli.json {
        println!("Dest File: {}", dest_full_path);
    }

    let report = client.send(prepared)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("File successfully uploaded to {}", dest_full_path);
    }

    Ok(())
}
