use std::{
    fmt,
    io::{Read, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::cipher::{Direction, transform};

use super::{
    DEFAULT_FRAME_CAPACITY, DEFAULT_IO_TIMEOUT, ProtocolTransport, Response, Role,
    TransportError, Workers, perform_handshake,
};

/// Phases a connection goes through on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Handshaking,
    ReadingFrame,
    Transforming,
    WritingFrame,
    Closed,
    Aborted,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            ConnectionState::Accepted => "accepted",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::ReadingFrame => "reading frame",
            ConnectionState::Transforming => "transforming",
            ConnectionState::WritingFrame => "writing frame",
            ConnectionState::Closed => "closed",
            ConnectionState::Aborted => "aborted",
        };
        write!(f, "{state}")
    }
}

/// Listens for clients of one direction and serves each on its own worker thread.
pub struct CipherServer {
    listener: TcpListener,
    role: Role,
    capacity: usize,
    timeout: Option<Duration>,
    shutdown: Arc<AtomicBool>,
}

impl CipherServer {
    pub fn bind<A: ToSocketAddrs>(
        address: A,
        direction: Direction,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address)?;
        Ok(Self {
            listener,
            role: Role::server(direction),
            capacity: DEFAULT_FRAME_CAPACITY,
            timeout: Some(DEFAULT_IO_TIMEOUT),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Sets the largest request frame, in bytes, a connection may send.
    pub fn with_frame_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets how long a connection may stall on a read or write before it is aborted. `None`
    /// waits forever, which also makes shutdown wait on idle peers.
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn shutdown_handle(&self) -> Result<ShutdownHandle, TransportError> {
        let mut address = self.local_addr()?;
        if address.ip().is_unspecified() {
            let loopback = match address {
                SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            };
            address.set_ip(loopback);
        }

        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            address,
        })
    }

    /// Accepts connections until shut down, then waits for in-flight connections.
    pub fn listen(self) -> Result<(), TransportError> {
        info!("{} listening at {}", self.role, self.local_addr()?);
        let mut workers = Workers::new();

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutting down, {} connections in flight", workers.running());
                break;
            }

            match stream {
                Ok(stream) => {
                    let role = self.role;
                    let capacity = self.capacity;
                    let timeout = self.timeout;
                    if let Err(e) = workers.spawn(move || serve(stream, role, capacity, timeout)) {
                        error!("failed to spawn connection worker: {e}");
                    }
                }
                Err(e) => warn!("broken connection: {e:?}"),
            }
        }

        Ok(())
    }
}

/// Stops a running [`CipherServer`] from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    address: SocketAddr,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);

        // the accept loop only looks at the flag once it accepts something
        if let Err(e) = TcpStream::connect(self.address) {
            warn!("failed to wake listener at {}: {e}", self.address);
        }
    }
}

fn serve(stream: TcpStream, role: Role, capacity: usize, timeout: Option<Duration>) {
    let peer = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown peer".to_string(),
    };
    info!("connection from {peer}");

    // a stalled read or write surfaces as an I/O error and aborts the connection
    if let Err(e) = stream
        .set_read_timeout(timeout)
        .and_then(|()| stream.set_write_timeout(timeout))
    {
        warn!("{peer}: failed to set timeout: {e}");
        return;
    }

    handle_connection(stream, role, capacity, &peer);
}

/// Runs one request/response cycle and returns the state the connection ended in.
///
/// The stream is dropped, and thereby closed, on every path out of this function.
pub(crate) fn handle_connection<T: Read + Write>(
    stream: T,
    role: Role,
    capacity: usize,
    peer: &str,
) -> ConnectionState {
    let mut connection = Connection {
        transport: ProtocolTransport::with_capacity(stream, capacity),
        role,
        state: ConnectionState::Accepted,
        peer,
    };

    match connection.run() {
        Ok(()) => info!("{peer}: served"),
        Err(e) => {
            warn!("{peer}: aborted while {}: {e}", connection.state);
            connection.advance(ConnectionState::Aborted);
        }
    }

    connection.state
}

struct Connection<'a, T: Read + Write> {
    transport: ProtocolTransport<T>,
    role: Role,
    state: ConnectionState,
    peer: &'a str,
}

impl<T: Read + Write> Connection<'_, T> {
    fn advance(&mut self, next: ConnectionState) {
        debug!("{}: {} -> {}", self.peer, self.state, next);
        self.state = next;
    }

    fn run(&mut self) -> Result<(), TransportError> {
        self.advance(ConnectionState::Handshaking);
        perform_handshake(&mut self.transport, self.role, self.role.peer())?;

        self.advance(ConnectionState::ReadingFrame);
        let req = self.transport.read_request()?;

        self.advance(ConnectionState::Transforming);
        let body = transform(self.role.direction(), req.payload(), req.key())?;

        self.advance(ConnectionState::WritingFrame);
        self.transport.write_response(&Response::new(body))?;

        self.advance(ConnectionState::Closed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{Shutdown, TcpStream},
    };

    use std::{sync::mpsc, thread};

    use super::*;
    use crate::protocol::test_util::{Duplex, start_server, start_server_with};

    fn exchange(address: SocketAddr, bytes: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(address).unwrap();
        stream.write_all(bytes).unwrap();
        let _ = stream.shutdown(Shutdown::Write);

        let mut out = Vec::new();
        // a reset after an aborted connection reads as an empty answer
        let _ = stream.read_to_end(&mut out);
        out
    }

    #[test]
    fn connection_state_success() {
        let mut stream = Duplex::new(b"ENC_CLIENTHELLO\nXMCKL\n");
        let state = handle_connection(
            &mut stream,
            Role::EncryptServer,
            DEFAULT_FRAME_CAPACITY,
            "test",
        );

        assert_eq!(state, ConnectionState::Closed);
        assert_eq!(stream.output, b"ENC_SERVERDQNVZ\n");
    }

    #[test]
    fn connection_writes_identifier_then_result() {
        let mut stream = Duplex::new(b"DEC_CLIENTDQNVZ\nXMCKL\n");
        let state = handle_connection(&mut stream, Role::DecryptServer, 64, "test");

        assert_eq!(state, ConnectionState::Closed);
        assert_eq!(stream.output, b"DEC_SERVERHELLO\n");
    }

    #[test]
    fn connection_aborts_on_wrong_client() {
        let mut stream = Duplex::new(b"ENC_CLIENTHELLO\nXMCKL\n");
        let state = handle_connection(&mut stream, Role::DecryptServer, 64, "test");

        assert_eq!(state, ConnectionState::Aborted);
        assert!(stream.output.is_empty());
        // nothing past the identifier was consumed
        assert_eq!(stream.input.position(), Role::IDENTIFIER_LEN as u64);
    }

    #[test]
    fn connection_aborts_on_short_key() {
        let mut stream = Duplex::new(b"ENC_CLIENTHELLOO\nXMCKL\n");
        let state = handle_connection(&mut stream, Role::EncryptServer, 64, "test");

        assert_eq!(state, ConnectionState::Aborted);
        assert_eq!(stream.output, b"ENC_SERVER");
    }

    #[test]
    fn connection_aborts_on_oversized_frame() {
        let mut stream = Duplex::new(b"ENC_CLIENTHELLO\nXMCKL\n");
        let state = handle_connection(&mut stream, Role::EncryptServer, 4, "test");

        assert_eq!(state, ConnectionState::Aborted);
    }

    #[test]
    fn encrypts_over_tcp() {
        let server = start_server(Direction::Encode);

        let out = exchange(server.address, b"ENC_CLIENTHELLO\nXMCKL\n");
        assert_eq!(out, b"ENC_SERVERDQNVZ\n");

        server.shutdown.shutdown();
        server.thread.join().unwrap().unwrap();
    }

    #[test]
    fn rejected_client_gets_nothing() {
        let server = start_server(Direction::Decode);

        let out = exchange(server.address, b"ENC_CLIENT");
        assert!(out.is_empty());

        server.shutdown.shutdown();
        server.thread.join().unwrap().unwrap();
    }

    #[test]
    fn listener_survives_failed_connections() {
        let server = start_server(Direction::Encode);

        for bad in [
            &b"DEC_CLIENT"[..],
            b"ENC_CLIENTHELLO\nXMC",
            b"ENC_CLIENThello\nxmckl\n",
            b"ENC_CLIENTHELLO XMCKL",
            b"EN",
        ] {
            let out = exchange(server.address, bad);
            assert!(!out.ends_with(b"\n"), "unexpected answer {out:?}");
        }

        let out = exchange(server.address, b"ENC_CLIENTHELLO\nXMCKL\n");
        assert_eq!(out, b"ENC_SERVERDQNVZ\n");

        server.shutdown.shutdown();
        server.thread.join().unwrap().unwrap();
    }

    #[test]
    fn stalled_connection_does_not_block_others() {
        let server = start_server(Direction::Encode);

        let mut stalled = TcpStream::connect(server.address).unwrap();
        stalled.write_all(b"ENC_CLIENTHELLO\nXM").unwrap();

        let (tx, rx) = mpsc::channel();
        let address = server.address;
        thread::spawn(move || {
            let _ = tx.send(exchange(address, b"ENC_CLIENTHELLO\nXMCKL\n"));
        });
        let out = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(out, b"ENC_SERVERDQNVZ\n");

        // the stalled connection still finishes on its own
        stalled.write_all(b"CKL\n").unwrap();
        let mut answer = Vec::new();
        stalled.read_to_end(&mut answer).unwrap();
        assert_eq!(answer, b"ENC_SERVERDQNVZ\n");

        server.shutdown.shutdown();
        server.thread.join().unwrap().unwrap();
    }

    #[test]
    fn shutdown_with_idle_client() {
        let server = start_server_with(Direction::Encode, Some(Duration::from_millis(200)));
        let idle = TcpStream::connect(server.address).unwrap();

        server.shutdown.shutdown();

        let (tx, rx) = mpsc::channel();
        let thread = server.thread;
        thread::spawn(move || {
            let _ = tx.send(thread.join().map(|r| r.is_ok()));
        });
        let stopped = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(stopped, Ok(true)));
        drop(idle);
    }

    #[test]
    fn idle_client_is_aborted() {
        let server = start_server_with(Direction::Decode, Some(Duration::from_millis(200)));

        let mut idle = TcpStream::connect(server.address).unwrap();
        idle.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut out = Vec::new();
        // the server closes the connection without answering
        let _ = idle.read_to_end(&mut out);
        assert!(out.is_empty());

        server.shutdown.shutdown();
        server.thread.join().unwrap().unwrap();
    }

    #[test]
    fn shutdown_stops_listener() {
        let server = start_server(Direction::Decode);
        let handle = server.shutdown.clone();

        handle.shutdown();
        assert!(server.thread.join().unwrap().is_ok());
        assert!(TcpStream::connect(server.address).is_err());
    }
}
