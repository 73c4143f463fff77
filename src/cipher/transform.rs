use std::fmt;

use super::{
    CipherError, Field,
    alphabet::{self, ALPHABET_LEN, SYMBOLS},
};

/// Direction of the transform; selects the server and client roles as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encode => write!(f, "encode"),
            Direction::Decode => write!(f, "decode"),
        }
    }
}

/// Removes one trailing `\n` or `\r\n` left behind by line-oriented readers.
pub fn strip_line_terminator(bytes: &[u8]) -> &[u8] {
    match bytes.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => bytes,
    }
}

/// Checks that `payload` and `key` can be transformed without producing any output.
pub fn validate(payload: &[u8], key: &[u8]) -> Result<(), CipherError> {
    symbols(payload, key).map(|_| ())
}

/// Applies the cipher in `direction` to `payload` using the leading symbols of `key`.
///
/// All input is validated before any output is produced, so an error never comes with a
/// partially transformed result.
pub fn transform(
    direction: Direction,
    payload: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let (payload, key) = symbols(payload, key)?;

    let out = payload
        .iter()
        .zip(&key)
        .map(|(&p, &k)| {
            let value = match direction {
                Direction::Encode => (p + k) % ALPHABET_LEN,
                Direction::Decode => (p + ALPHABET_LEN - k) % ALPHABET_LEN,
            };
            SYMBOLS[usize::from(value)]
        })
        .collect();

    Ok(out)
}

fn symbols(payload: &[u8], key: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CipherError> {
    let payload = strip_line_terminator(payload);
    let key = strip_line_terminator(key);

    if key.len() < payload.len() {
        return Err(CipherError::KeyTooShort {
            key: key.len(),
            payload: payload.len(),
        });
    }

    let payload = alphabet::encode_all(payload, Field::Payload)?;
    let key = alphabet::encode_all(key, Field::Key)?;
    Ok((payload, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_vector() {
        let out = transform(Direction::Encode, b"HELLO", b"XMCKL").unwrap();
        assert_eq!(out, b"DQNVZ");
    }

    #[test]
    fn decode_known_vector() {
        let out = transform(Direction::Decode, b"DQNVZ", b"XMCKL").unwrap();
        assert_eq!(out, b"HELLO");
    }

    #[test]
    fn space_wraps_around() {
        // 26 + 1 = 27 -> 0
        assert_eq!(transform(Direction::Encode, b" ", b"B").unwrap(), b"A");
        // 0 - 1 -> 26
        assert_eq!(transform(Direction::Decode, b"A", b"B").unwrap(), b" ");
    }

    #[test]
    fn round_trip_every_pair() {
        let alphabet = SYMBOLS.to_vec();

        for &p in &alphabet {
            let payload = vec![p; alphabet.len()];
            let encoded = transform(Direction::Encode, &payload, &alphabet).unwrap();
            assert!(encoded.iter().all(|b| alphabet.contains(b)));

            let decoded = transform(Direction::Decode, &encoded, &alphabet).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn only_leading_key_symbols_are_used() {
        let short = transform(Direction::Encode, b"HELLO", b"XMCKL").unwrap();
        let long = transform(Direction::Encode, b"HELLO", b"XMCKLQQQ ZZ").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn key_too_short() {
        let err = transform(Direction::Encode, b"HELLOO", b"XMCKL").unwrap_err();
        assert_eq!(err, CipherError::KeyTooShort { key: 5, payload: 6 });
    }

    #[test]
    fn bad_character_in_payload() {
        let err = transform(Direction::Encode, b"HEL1O", b"XMCKL").unwrap_err();
        assert_eq!(
            err,
            CipherError::BadCharacter {
                field: Field::Payload,
                position: 3,
                byte: b'1'
            }
        );
    }

    #[test]
    fn bad_character_in_unused_key_tail() {
        let err = transform(Direction::Decode, b"HELLO", b"XMCKLxx").unwrap_err();
        assert_eq!(
            err,
            CipherError::BadCharacter {
                field: Field::Key,
                position: 5,
                byte: b'x'
            }
        );
    }

    #[test]
    fn trailing_newline_is_not_a_symbol() {
        let out = transform(Direction::Encode, b"HELLO\n", b"XMCKL\r\n").unwrap();
        assert_eq!(out, b"DQNVZ");
        assert!(validate(b"HELLO\n", b"XMCKL\n").is_ok());
    }

    #[test]
    fn empty_payload() {
        assert_eq!(transform(Direction::Encode, b"", b"").unwrap(), b"");
    }

    #[test]
    fn strip_only_one_terminator() {
        assert_eq!(strip_line_terminator(b"AB\n\n"), b"AB\n");
        assert_eq!(strip_line_terminator(b"AB\r\n"), b"AB");
        assert_eq!(strip_line_terminator(b"AB"), b"AB");
        assert_eq!(strip_line_terminator(b"AB\r"), b"AB\r");
    }

    #[test]
    fn lone_carriage_return_is_a_bad_character() {
        let err = transform(Direction::Encode, b"AB\r", b"XMCKL").unwrap_err();
        assert_eq!(
            err,
            CipherError::BadCharacter {
                field: Field::Payload,
                position: 2,
                byte: b'\r'
            }
        );
    }
}
