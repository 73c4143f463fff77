use std::{
    fmt,
    io::{Read, Write},
};

use log::{debug, warn};

use crate::cipher::Direction;

use super::{ProtocolTransport, TransportError};

/// Endpoint roles; a connection is only serviced between complementary roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    EncryptClient,
    EncryptServer,
    DecryptClient,
    DecryptServer,
}

impl Role {
    /// Length in bytes of every wire identifier.
    pub const IDENTIFIER_LEN: usize = 10;

    pub fn client(direction: Direction) -> Self {
        match direction {
            Direction::Encode => Role::EncryptClient,
            Direction::Decode => Role::DecryptClient,
        }
    }

    pub fn server(direction: Direction) -> Self {
        match direction {
            Direction::Encode => Role::EncryptServer,
            Direction::Decode => Role::DecryptServer,
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Role::EncryptClient => "ENC_CLIENT",
            Role::EncryptServer => "ENC_SERVER",
            Role::DecryptClient => "DEC_CLIENT",
            Role::DecryptServer => "DEC_SERVER",
        }
    }

    /// The role on the other end of a valid connection.
    pub fn peer(&self) -> Self {
        match self {
            Role::EncryptClient => Role::EncryptServer,
            Role::EncryptServer => Role::EncryptClient,
            Role::DecryptClient => Role::DecryptServer,
            Role::DecryptServer => Role::DecryptClient,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Role::EncryptClient | Role::EncryptServer => Direction::Encode,
            Role::DecryptClient | Role::DecryptServer => Direction::Decode,
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Role::EncryptClient | Role::DecryptClient)
    }

    pub fn from_identifier(bytes: &[u8]) -> Option<Self> {
        [
            Role::EncryptClient,
            Role::EncryptServer,
            Role::DecryptClient,
            Role::DecryptServer,
        ]
        .into_iter()
        .find(|role| role.identifier().as_bytes() == bytes)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Exchanges role identifiers on a fresh connection.
///
/// A client sends its identifier first and expects `expected_peer` back. A server reads the
/// client identifier first and only answers when it matches `expected_peer`; on a mismatch it
/// returns without writing anything so that dropping the stream is the only rejection signal.
pub fn perform_handshake<T: Read + Write>(
    transport: &mut ProtocolTransport<T>,
    my_role: Role,
    expected_peer: Role,
) -> Result<(), TransportError> {
    if my_role.is_client() {
        client_handshake(transport, my_role, expected_peer)
    } else {
        server_handshake(transport, my_role, expected_peer)
    }
}

fn client_handshake<T: Read + Write>(
    transport: &mut ProtocolTransport<T>,
    my_role: Role,
    expected_peer: Role,
) -> Result<(), TransportError> {
    let wrong_server = |actual: Option<String>| TransportError::WrongServer {
        expected: expected_peer,
        actual,
    };

    if let Err(e) = transport.write_identifier(my_role) {
        debug!("failed to send {my_role} identifier: {e}");
        return Err(wrong_server(None));
    }

    let identifier = match transport.read_identifier() {
        Ok(identifier) => identifier,
        Err(e) => {
            debug!("no identifier received from server: {e}");
            return Err(wrong_server(None));
        }
    };

    if identifier.as_slice() != expected_peer.identifier().as_bytes() {
        let actual = String::from_utf8_lossy(&identifier).into_owned();
        warn!("expected {expected_peer}, server identified as '{actual}'");
        return Err(wrong_server(Some(actual)));
    }

    debug!("handshake complete: {my_role} <-> {expected_peer}");
    Ok(())
}

fn server_handshake<T: Read + Write>(
    transport: &mut ProtocolTransport<T>,
    my_role: Role,
    expected_peer: Role,
) -> Result<(), TransportError> {
    let identifier = transport.read_identifier()?;

    if identifier.as_slice() != expected_peer.identifier().as_bytes() {
        match Role::from_identifier(&identifier) {
            Some(role) => debug!("{my_role} refusing {role}"),
            None => debug!("{my_role} refusing unknown identifier {identifier:?}"),
        }
        return Err(TransportError::WrongClient {
            expected: expected_peer,
            actual: String::from_utf8_lossy(&identifier).into_owned(),
        });
    }

    transport.write_identifier(my_role)?;
    debug!("handshake complete: {my_role} <-> {expected_peer}");
    Ok(())
}
