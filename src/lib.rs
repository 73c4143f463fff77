pub mod cipher;
pub mod cli;
pub mod protocol;

pub use cipher::{CipherError, Direction, transform};
pub use protocol::{CipherClient, CipherServer, Role, TransportError};
