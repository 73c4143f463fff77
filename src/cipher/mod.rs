//! Additive stream cipher over a 27-symbol alphabet.
//!
//! This module contains everything needed to turn a payload and a key into ciphertext (and
//! back) without touching the network. It is used by the servers to answer requests and by the
//! clients to validate input before anything is sent.
//!
//! # Overview
//!
//! The alphabet is the 26 upper-case ASCII letters followed by the space character. Each symbol
//! maps onto a value in `0..27`:
//!
//! - `'A'..='Z'` map to `0..=25`.
//! - `' '` maps to `26`.
//!
//! Encoding adds the key value to the payload value modulo 27, decoding subtracts it. Only the
//! first `payload.len()` symbols of the key are consumed.
//!
//! # Example
//! ```rust
//! use otp::cipher::{Direction, transform};
//!
//! let ciphertext = transform(Direction::Encode, b"HELLO", b"XMCKL").unwrap();
//! assert_eq!(ciphertext, b"DQNVZ");
//!
//! let plaintext = transform(Direction::Decode, &ciphertext, b"XMCKL").unwrap();
//! assert_eq!(plaintext, b"HELLO");
//! ```
//!
//! This is character substitution, not cryptography. It offers no integrity and no
//! confidentiality once a key is reused.
pub mod alphabet;
pub mod keygen;
mod transform;

use std::fmt;

use thiserror::Error;

pub use transform::{Direction, strip_line_terminator, transform, validate};

/// Which half of a message an offending byte was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Payload,
    Key,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Payload => write!(f, "payload"),
            Field::Key => write!(f, "key"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("bad character {byte:#04x} in {field} at position {position}")]
    BadCharacter {
        field: Field,
        position: usize,
        byte: u8,
    },

    #[error("key is too short: {key} symbols for a payload of {payload}")]
    KeyTooShort { key: usize, payload: usize },
}
