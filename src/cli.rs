//! CLI utilities for the cipher servers, clients and key generator.
//!
//! The binaries under `src/bin` are thin wrappers around the functions in this module; the
//! encrypting and decrypting programs only differ in the [`Direction`] they pass in.
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use clap::Parser;
use log::{info, warn};
use thiserror::Error;

use crate::{
    cipher::{CipherError, Direction, keygen, strip_line_terminator},
    protocol::{
        CipherClient, CipherServer, DEFAULT_FRAME_CAPACITY, DEFAULT_IO_TIMEOUT, Role,
        TransportError,
    },
};

/// Arguments for `enc_server` and `dec_server`.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct ServerCli {
    /// Port to listen on
    pub port: u16,
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    /// Largest request frame accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_FRAME_CAPACITY)]
    pub max_frame_size: usize,
    /// Seconds a connection may stall before it is dropped, 0 to wait forever
    #[arg(long, default_value_t = DEFAULT_IO_TIMEOUT.as_secs())]
    pub timeout: u64,
}

impl ServerCli {
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

/// Arguments for `enc_client` and `dec_client`.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct ClientCli {
    /// File holding the text to transform
    pub input: PathBuf,
    /// File holding the key
    pub key: PathBuf,
    /// Port the server listens on
    pub port: u16,
    /// Host the server runs on
    #[arg(long, default_value = "localhost")]
    pub host: String,
    /// Largest request frame sent, in bytes
    #[arg(long, default_value_t = DEFAULT_FRAME_CAPACITY)]
    pub max_frame_size: usize,
}

/// Arguments for `keygen`.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct KeygenCli {
    /// Number of key symbols to generate
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub length: u32,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not open {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("could not contact {server} on port {port}")]
    Contact {
        server: String,
        port: u16,
        #[source]
        source: TransportError,
    },

    #[error("key '{}' is too short", .path.display())]
    KeyTooShort { path: PathBuf },

    #[error("input contains bad characters: {0}")]
    BadInput(CipherError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Process exit status: 2 when the server could not be reached or was the wrong kind, 1
    /// otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Contact { .. } => 2,
            _ => 1,
        }
    }
}

/// Parses arguments, exiting with status 1 on a usage error.
pub fn parse<P: Parser>() -> P {
    match P::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    }
}

/// Status for a failed parse: 0 for `--help` and `--version`, 1 otherwise. Status 2 stays
/// reserved for contact errors.
fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() { 1 } else { 0 }
}

/// Reads a message file, dropping one trailing line terminator.
pub fn read_message(path: &Path) -> Result<Vec<u8>, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(strip_line_terminator(&bytes).to_vec())
}

/// Runs a server until interrupted.
///
/// The first interrupt stops the listener and waits for in-flight connections, a second one
/// exits immediately.
pub fn run_server(cli: &ServerCli, direction: Direction) -> Result<(), TransportError> {
    let server = CipherServer::bind((cli.host.as_str(), cli.port), direction)?
        .with_frame_capacity(cli.max_frame_size)
        .with_io_timeout(cli.io_timeout());

    let handle = server.shutdown_handle()?;
    let interrupted = AtomicBool::new(false);
    if let Err(e) = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            warn!("interrupted again, exiting");
            std::process::exit(130);
        }
        info!("interrupted, stopping listener");
        handle.shutdown();
    }) {
        warn!("failed to install interrupt handler: {e}");
    }

    server.listen()
}

/// Sends the input and key files named by `cli` and returns the server's result.
pub fn run_client(cli: &ClientCli, direction: Direction) -> Result<Vec<u8>, CliError> {
    let payload = read_message(&cli.input)?;
    let key = read_message(&cli.key)?;

    let address = (cli.host.as_str(), cli.port);
    let client = CipherClient::connect_with_capacity(address, direction, cli.max_frame_size)
        .map_err(|source| CliError::Contact {
            server: Role::server(direction).identifier().to_lowercase(),
            port: cli.port,
            source,
        })?;

    client.submit(&payload, &key).map_err(|e| match e {
        TransportError::Cipher(CipherError::KeyTooShort { .. }) => CliError::KeyTooShort {
            path: cli.key.clone(),
        },
        TransportError::Cipher(e) => CliError::BadInput(e),
        e => CliError::Transport(e),
    })
}

/// Writes `length` random key symbols followed by a newline.
pub fn run_keygen<W: Write>(length: usize, mut writer: W) -> io::Result<()> {
    let key = keygen::generate(length, &mut rand::thread_rng());
    writer.write_all(&key)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Entry point shared by `enc_client` and `dec_client`.
pub fn client_main(direction: Direction) -> ExitCode {
    let cli: ClientCli = parse();

    let result = run_client(&cli, direction).and_then(|out| {
        let mut stdout = io::stdout().lock();
        stdout.write_all(&out)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
