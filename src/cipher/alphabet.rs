//! Mapping between alphabet bytes and their numeric values.
use super::{CipherError, Field};

/// Alphabet symbols, indexed by their numeric value.
pub const SYMBOLS: &[u8; 27] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ ";

/// Number of symbols in the alphabet.
pub const ALPHABET_LEN: u8 = SYMBOLS.len() as u8;

const SPACE_VALUE: u8 = 26;

/// Numeric value of an alphabet byte, or `None` if the byte is outside the alphabet.
pub fn encode(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b' ' => Some(SPACE_VALUE),
        _ => None,
    }
}

/// Alphabet byte for a numeric value, or `None` if the value is not below [`ALPHABET_LEN`].
pub fn decode(value: u8) -> Option<u8> {
    SYMBOLS.get(usize::from(value)).copied()
}

/// Encodes every byte of `bytes`, failing on the first byte outside the alphabet.
pub(crate) fn encode_all(bytes: &[u8], field: Field) -> Result<Vec<u8>, CipherError> {
    bytes
        .iter()
        .enumerate()
        .map(|(position, &byte)| {
            encode(byte).ok_or(CipherError::BadCharacter {
                field,
                position,
                byte,
            })
        })
        .collect()
}
