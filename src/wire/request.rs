//! The `Request` payload: a client's registration for a subdomain.

use bytes::{Buf, BufMut, BytesMut};

use super::Error;

/// The fixed-size portion of a `Request` payload: `proto` (1 byte) + `nameLength` (4 bytes).
pub const REQUEST_SIZE: usize = 5;

const MIN_NAME_LEN: usize = 1;
const MAX_NAME_LEN: usize = 4096;

/// Which application protocol the registered tunnel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Http,
    Tcp,
}

impl Proto {
    fn from_u8(byte: u8) -> Result<Proto, Error> {
        match byte {
            0x01 => Ok(Proto::Http),
            0x02 => Ok(Proto::Tcp),
            other => Err(Error::UnknownProto(other)),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Proto::Http => 0x01,
            Proto::Tcp => 0x02,
        }
    }

    /// The scheme prefix used when announcing a registered domain to the user.
    pub fn scheme(self) -> &'static str {
        match self {
            Proto::Http => "https://",
            Proto::Tcp => "tcp:",
        }
    }
}

/// A client's request to register `name` under `proto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub proto: Proto,
    pub name: String,
}

impl Request {
    pub fn new(proto: Proto, name: impl Into<String>) -> Result<Request, Error> {
        let name = name.into();
        validate_name_len(name.len())?;
        Ok(Request { proto, name })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        encode_with_length(self.proto, self.name.len() as u32, &self.name, buf)
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Request, Error> {
        if bytes.len() < REQUEST_SIZE {
            return Err(Error::Truncated {
                expected: REQUEST_SIZE,
                found: bytes.len(),
            });
        }
        let proto = Proto::from_u8(bytes.get_u8())?;
        let name_length = bytes.get_u32() as usize;
        let total = REQUEST_SIZE + name_length;
        if bytes.len() < name_length {
            return Err(Error::Truncated {
                expected: total,
                found: REQUEST_SIZE + bytes.len(),
            });
        }
        validate_name_len(name_length)?;
        let name_bytes = &bytes[..name_length];
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| Error::LengthMismatch {
                declared: name_length,
                actual: name_bytes.len(),
            })?
            .to_owned();
        Ok(Request { proto, name })
    }
}

/// Encode a request from its raw, possibly-inconsistent parts.
///
/// This exists (rather than being folded into [`Request::encode`]) so tests can
/// exercise the length-mismatch validation law directly: [`Request::encode`]
/// always passes a consistent `name_length`, but the wire format itself allows
/// a caller to claim a `name_length` that disagrees with `name`, which must be
/// rejected rather than silently truncating or overrunning.
pub fn encode_with_length(
    proto: Proto,
    name_length: u32,
    name: &str,
    buf: &mut BytesMut,
) -> Result<(), Error> {
    if name_length as usize != name.len() {
        return Err(Error::LengthMismatch {
            declared: name_length as usize,
            actual: name.len(),
        });
    }
    validate_name_len(name.len())?;
    buf.reserve(REQUEST_SIZE + name.len());
    buf.put_u8(proto.to_u8());
    buf.put_u32(name_length);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn validate_name_len(len: usize) -> Result<(), Error> {
    if len < MIN_NAME_LEN {
        return Err(Error::EmptyName);
    }
    if len > MAX_NAME_LEN {
        return Err(Error::StringTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrips() {
        let request = Request::new(Proto::Http, "alpha").unwrap();
        let mut buf = BytesMut::new();
        request.encode(&mut buf).unwrap();
        assert_eq!(Request::decode(&buf).unwrap(), request);
    }

    #[test]
    fn decode_fails_truncated_when_shorter_than_declared() {
        let mut buf = BytesMut::new();
        encode_with_length(Proto::Tcp, 5, "alpha", &mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        match Request::decode(&buf) {
            Err(Error::Truncated { .. }) => {}
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn encode_rejects_length_mismatch() {
        let mut buf = BytesMut::new();
        match encode_with_length(Proto::Http, 4, "alpha", &mut buf) {
            Err(Error::LengthMismatch { .. }) => {}
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        match Request::new(Proto::Http, "") {
            Err(Error::EmptyName) => {}
            other => panic!("expected EmptyName, got {:?}", other),
        }
    }
}
