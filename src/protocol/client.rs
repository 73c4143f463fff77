use std::net::{TcpStream, ToSocketAddrs};

use log::{debug, info};

use crate::cipher::{self, Direction, strip_line_terminator};

use super::{
    DEFAULT_FRAME_CAPACITY, ProtocolTransport, Request, Role, TransportError, perform_handshake,
};

/// Client for a single request against an encrypting or decrypting server.
///
/// The handshake happens on connect; [`CipherClient::submit`] consumes the client because a
/// connection only ever carries one request.
pub struct CipherClient {
    transport: ProtocolTransport<TcpStream>,
    role: Role,
}

impl CipherClient {
    pub fn connect<A: ToSocketAddrs>(
        address: A,
        direction: Direction,
    ) -> Result<Self, TransportError> {
        Self::connect_with_capacity(address, direction, DEFAULT_FRAME_CAPACITY)
    }

    pub fn connect_with_capacity<A: ToSocketAddrs>(
        address: A,
        direction: Direction,
        capacity: usize,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(address)?;
        info!("connected to {}", stream.peer_addr()?);

        let mut transport = ProtocolTransport::with_capacity(stream, capacity);
        let role = Role::client(direction);
        perform_handshake(&mut transport, role, role.peer())?;

        Ok(Self { transport, role })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Sends `payload` and `key` and returns the server's result.
    ///
    /// Input is validated before anything is written, an invalid request never leaves the
    /// client.
    pub fn submit(mut self, payload: &[u8], key: &[u8]) -> Result<Vec<u8>, TransportError> {
        cipher::validate(payload, key)?;

        let req = Request::new(
            strip_line_terminator(payload).to_vec(),
            strip_line_terminator(key).to_vec(),
        );
        let frame_len = req.to_bytes().len();
        if frame_len > self.transport.capacity() {
            return Err(TransportError::FrameTooLarge {
                capacity: self.transport.capacity(),
            });
        }

        self.transport.write_request(&req)?;
        debug!("{} sent {frame_len} byte request", self.role);

        let resp = self.transport.read_response()?;
        Ok(resp.into_body())
    }
}
