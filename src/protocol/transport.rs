use std::io::{self, ErrorKind, Read, Write};

use log::trace;
use thiserror::Error;

use crate::cipher::CipherError;

use super::{DEFAULT_FRAME_CAPACITY, Request, Response, Role, TERMINATOR};

const READ_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed frame: no separator between payload and key")]
    MalformedFrame,
    #[error("frame exceeds capacity of {capacity} bytes")]
    FrameTooLarge { capacity: usize },
    #[error("connection closed after {received} bytes, before the frame was terminated")]
    ConnectionClosedEarly { received: usize },
    #[error("expected {expected}, server answered {}", .actual.as_deref().unwrap_or("nothing"))]
    WrongServer {
        expected: Role,
        actual: Option<String>,
    },
    #[error("expected {expected}, client identified as '{actual}'")]
    WrongClient { expected: Role, actual: String },
    #[error("rejected input: {0}")]
    Cipher(#[from] CipherError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Framed reads and writes over a bidirectional stream.
///
/// Reads never buffer past the end of the frame they were asked for except within the final
/// chunk of a frame, which is discarded; a connection carries a single request and response.
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    capacity: usize,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self::with_capacity(stream, DEFAULT_FRAME_CAPACITY)
    }

    pub fn with_capacity(stream: T, capacity: usize) -> Self {
        Self { stream, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    pub fn write_identifier(&mut self, role: Role) -> Result<(), TransportError> {
        self.write_frame(role.identifier().as_bytes())
    }

    pub fn read_identifier(&mut self) -> Result<[u8; Role::IDENTIFIER_LEN], TransportError> {
        let mut identifier = [0; Role::IDENTIFIER_LEN];
        self.stream.read_exact(&mut identifier)?;
        Ok(identifier)
    }

    pub fn write_request(&mut self, req: &Request) -> Result<(), TransportError> {
        self.write_frame(&req.to_bytes())
    }

    pub fn read_request(&mut self) -> Result<Request, TransportError> {
        let frame = self.read_frame(2)?;
        Request::parse(&frame)
    }

    pub fn write_response(&mut self, resp: &Response) -> Result<(), TransportError> {
        self.write_frame(&resp.to_bytes())
    }

    pub fn read_response(&mut self) -> Result<Response, TransportError> {
        let frame = self.read_frame(1)?;
        Ok(Response::new(frame))
    }

    /// Writes all of `bytes`, resuming after partial writes, then flushes.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        trace!("wrote {} bytes", bytes.len());
        Ok(())
    }

    /// Reads until `terminators` terminator bytes have been seen and returns everything before
    /// the last one. Earlier terminators are kept, they act as separators.
    fn read_frame(&mut self, terminators: usize) -> Result<Vec<u8>, TransportError> {
        let mut frame = Vec::with_capacity(self.capacity.min(READ_CHUNK_SIZE));
        let mut chunk = [0; READ_CHUNK_SIZE];
        let mut seen = 0;

        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(TransportError::ConnectionClosedEarly {
                        received: frame.len(),
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            trace!("read {n} bytes");

            for &byte in &chunk[..n] {
                // the terminator counts toward the capacity as well
                if frame.len() + 1 > self.capacity {
                    return Err(TransportError::FrameTooLarge {
                        capacity: self.capacity,
                    });
                }

                if byte == TERMINATOR {
                    seen += 1;
                    if seen == terminators {
                        return Ok(frame);
                    }
                }
                frame.push(byte);
            }
        }
    }
}
