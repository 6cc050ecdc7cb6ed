//! The `Response` payload: the server's reply to a registration `Request`.

use bytes::{Buf, BufMut, BytesMut};

use super::Error;

/// The fixed-size portion of a `Response` payload: `status` (1) + `ttlHours` (8) + `domainLength` (4).
pub const RESPONSE_SIZE: usize = 13;

/// The outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NameTaken,
    UnsupportedProto,
}

impl Status {
    fn from_u8(byte: u8) -> Result<Status, Error> {
        match byte {
            0x01 => Ok(Status::Ok),
            0x03 => Ok(Status::NameTaken),
            0x04 => Ok(Status::UnsupportedProto),
            other => Err(Error::UnknownStatus(other)),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Status::Ok => 0x01,
            Status::NameTaken => 0x03,
            Status::UnsupportedProto => 0x04,
        }
    }
}

/// The server's reply to a [`super::Request`].
///
/// `ttlHours` is carried verbatim from the wire: it is recorded that the
/// client actually treats this field as nanoseconds-until-expiry rather than
/// hours, and this type does not resolve that discrepancy — it only stores
/// the value the server sent. [`crate::session`] is where the (possibly
/// mislabeled) conversion to an expiry instant happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub ttl_hours: u64,
    pub domain: String,
}

impl Response {
    /// Construct and validate a `Response`, enforcing that `domain` is present
    /// and non-empty exactly when `status == Ok`.
    pub fn new(status: Status, ttl_hours: u64, domain: impl Into<String>) -> Result<Response, Error> {
        let domain = domain.into();
        validate(status, &domain)?;
        Ok(Response {
            status,
            ttl_hours,
            domain,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        validate(self.status, &self.domain)?;
        let domain_len = self.domain.len();
        if domain_len > u32::MAX as usize {
            return Err(Error::StringTooLong {
                len: domain_len,
                max: u32::MAX as usize,
            });
        }
        buf.reserve(RESPONSE_SIZE + domain_len);
        buf.put_u8(self.status.to_u8());
        buf.put_u64(self.ttl_hours);
        buf.put_u32(domain_len as u32);
        buf.put_slice(self.domain.as_bytes());
        Ok(())
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Response, Error> {
        if bytes.len() < RESPONSE_SIZE {
            return Err(Error::Truncated {
                expected: RESPONSE_SIZE,
                found: bytes.len(),
            });
        }
        let status = Status::from_u8(bytes.get_u8())?;
        let ttl_hours = bytes.get_u64();
        let domain_length = bytes.get_u32() as usize;
        if bytes.len() < domain_length {
            return Err(Error::Truncated {
                expected: RESPONSE_SIZE + domain_length,
                found: RESPONSE_SIZE + bytes.len(),
            });
        }
        let domain_bytes = &bytes[..domain_length];
        let domain = std::str::from_utf8(domain_bytes)
            .map_err(|_| Error::LengthMismatch {
                declared: domain_length,
                actual: domain_bytes.len(),
            })?
            .to_owned();
        validate(status, &domain)?;
        Ok(Response {
            status,
            ttl_hours,
            domain,
        })
    }
}

fn validate(status: Status, domain: &str) -> Result<(), Error> {
    if status == Status::Ok && domain.is_empty() {
        return Err(Error::EmptyName);
    }
    Ok(())
}
