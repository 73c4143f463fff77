use super::{SEPARATOR, TERMINATOR, TransportError};

/// A payload and the key to transform it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    payload: Vec<u8>,
    key: Vec<u8>,
}

impl Request {
    pub fn new(payload: Vec<u8>, key: Vec<u8>) -> Self {
        Self { payload, key }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Splits a frame body (terminator already removed) at the first separator.
    pub fn parse(frame: &[u8]) -> Result<Self, TransportError> {
        let split = frame
            .iter()
            .position(|&b| b == SEPARATOR)
            .ok_or(TransportError::MalformedFrame)?;

        Ok(Self {
            payload: frame[..split].to_vec(),
            key: frame[split + 1..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + self.key.len() + 2);
        out.extend_from_slice(&self.payload);
        out.push(SEPARATOR);
        out.extend_from_slice(&self.key);
        out.push(TERMINATOR);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_form() {
        let req = Request::new(b"HELLO".to_vec(), b"XMCKL".to_vec());
        assert_eq!(req.to_bytes(), b"HELLO\nXMCKL\n");
    }

    #[test]
    fn parse_splits_at_first_separator() {
        let req = Request::parse(b"HELLO\nXMCKL").unwrap();
        assert_eq!(req.payload(), b"HELLO");
        assert_eq!(req.key(), b"XMCKL");
    }

    #[test]
    fn parse_empty_halves() {
        let req = Request::parse(b"\n").unwrap();
        assert!(req.payload().is_empty());
        assert!(req.key().is_empty());
    }

    #[test]
    fn parse_without_separator() {
        let err = Request::parse(b"HELLOXMCKL").unwrap_err();
        assert!(matches!(err, TransportError::MalformedFrame));
    }
}
