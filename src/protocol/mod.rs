//! Client-server communication protocol.
//!
//! This module defines how a client hands a payload and a key to a cipher server and how the
//! result travels back. It covers the role handshake, the message framing on the byte stream,
//! the per-connection server loop and the matching client.
//!
//! # Overview
//!
//! Every connection carries exactly one request and one response:
//!
//! 1. The client sends its role identifier (e.g. `ENC_CLIENT`).
//! 2. The server checks it against the role it serves and answers with its own identifier
//!    (e.g. `ENC_SERVER`), or closes the connection on a mismatch.
//! 3. The client sends a request frame, the server transforms it and answers with a response
//!    frame, then the connection is closed.
//!
//! Encrypting and decrypting pipelines never cross: an `ENC_CLIENT` is refused by a decrypting
//! server and a `DEC_CLIENT` by an encrypting one.
//!
//! # Key Components
//!
//! - [`Role`]: The four endpoint roles and their wire identifiers.
//! - [`ProtocolTransport`]: Framed reads and writes over any bidirectional byte stream.
//! - [`CipherServer`]: Accept loop spawning one worker per connection.
//! - [`CipherClient`]: Single-shot client for either direction.
//!
//! # Wire Format
//!
//! Role identifiers are fixed 10-byte ASCII strings with no terminator. Frames are plain text:
//!
//! - Request: `<payload>\n<key>\n`
//! - Response: `<result>\n`
//!
//! Neither payload, key nor result may contain a newline, so the terminator is unambiguous.
//! Frames larger than the configured capacity are rejected.
//!
//! # See Also
//!
//! - [`cipher`](crate::cipher): The transform applied to every request.
mod client;
mod request;
mod response;
mod role;
mod server;
mod thread;
mod transport;

use thread::Workers;

pub use client::CipherClient;
pub use request::Request;
pub use response::Response;
pub use role::{Role, perform_handshake};
pub use server::{CipherServer, ConnectionState, ShutdownHandle};
pub use transport::{ProtocolTransport, TransportError};

use std::time::Duration;

/// Default upper bound, in bytes, for a single frame.
pub const DEFAULT_FRAME_CAPACITY: usize = 70_000;

/// Default time a server connection may stall on a read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Separates the payload from the key inside a request frame.
pub(crate) const SEPARATOR: u8 = b'\n';
/// Marks the end of a frame.
pub(crate) const TERMINATOR: u8 = b'\n';
