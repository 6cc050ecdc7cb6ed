//! The fixed 12-byte header shared by every frame on a wormhole stream.

use bytes::{Buf, BufMut, BytesMut};

use super::Error;

/// Every frame on the wire begins with this many bytes before its payload.
pub const HEADER_LEN: usize = 12;

/// Payloads larger than this are rejected before they are ever read off the wire.
pub const MAX_PAYLOAD_SIZE: u64 = 1024 * 1024;

/// The single wire protocol version this client speaks.
pub const VERSION: u8 = 0x10;

/// The kind of message a [`Header`] introduces.
///
/// Unlike `version`/`length`/`reserved`, the type byte is not validated at
/// decode time: only the *known* values are named here, and
/// leaves classification of anything else to the stream dispatcher (which
/// closes the stream and logs at debug). `Unknown` carries the raw byte
/// through so the dispatcher can do exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Access,
    Ack,
    Metrics,
    End,
    Error,
    Unknown(u8),
}

impl MessageType {
    fn from_u8(byte: u8) -> MessageType {
        use MessageType::*;
        match byte {
            0x01 => Request,
            0x02 => Response,
            0x03 => Access,
            0x04 => Ack,
            0x05 => Metrics,
            0x06 => End,
            0xFF => Error,
            other => Unknown(other),
        }
    }

    fn to_u8(self) -> u8 {
        use MessageType::*;
        match self {
            Request => 0x01,
            Response => 0x02,
            Access => 0x03,
            Ack => 0x04,
            Metrics => 0x05,
            End => 0x06,
            Error => 0xFF,
            Unknown(byte) => byte,
        }
    }
}

/// The `flags` bitfield carried by every [`Header`].
///
/// Only one bit is currently named; the rest are reserved for future use and
/// are preserved (but ignored) across `set`/`clear`/`has`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    /// The client requests that the server open a metrics stream.
    pub const METRICS: u8 = 0x01;

    pub fn empty() -> Flags {
        Flags(0)
    }

    pub fn from_bits(bits: u8) -> Flags {
        Flags(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn set(&mut self, bit: u8) {
        self.0 |= bit;
    }

    pub fn clear(&mut self, bit: u8) {
        self.0 &= !bit;
    }

    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// The fixed, big-endian header that precedes every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: MessageType,
    pub flags: Flags,
    pub length: u64,
}

impl Header {
    pub fn new(message_type: MessageType, flags: Flags, length: u64) -> Header {
        Header {
            message_type,
            flags,
            length,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        if self.length > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge(self.length));
        }
        buf.reserve(HEADER_LEN);
        buf.put_u8(VERSION);
        buf.put_u8(self.message_type.to_u8());
        buf.put_u8(self.flags.bits());
        buf.put_u64(self.length);
        buf.put_u8(0); // reserved
        Ok(())
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Header, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        let version = bytes.get_u8();
        if version != VERSION {
            return Err(Error::InvalidVersion(version));
        }
        let message_type = MessageType::from_u8(bytes.get_u8());
        let flags = Flags::from_bits(bytes.get_u8());
        let length = bytes.get_u64();
        if length > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge(length));
        }
        let reserved = bytes.get_u8();
        if reserved != 0 {
            return Err(Error::ReservedNonZero(reserved));
        }
        Ok(Header {
            message_type,
            flags,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(header: Header) {
        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        let decoded = Header::decode(&buf).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_roundtrips() {
        roundtrip(Header::new(MessageType::Request, Flags::empty(), 0));
        roundtrip(Header::new(
            MessageType::Response,
            Flags::from_bits(Flags::METRICS),
            12345,
        ));
        roundtrip(Header::new(MessageType::Access, Flags::empty(), MAX_PAYLOAD_SIZE));
    }

    #[test]
    fn decode_rejects_bad_version() {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Request, Flags::empty(), 0)
            .encode(&mut buf)
            .unwrap();
        buf[0] = 0x11;
        match Header::decode(&buf) {
            Err(Error::InvalidVersion(0x11)) => {}
            other => panic!("expected InvalidVersion, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_reserved_nonzero() {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Request, Flags::empty(), 0)
            .encode(&mut buf)
            .unwrap();
        *buf.last_mut().unwrap() = 1;
        match Header::decode(&buf) {
            Err(Error::ReservedNonZero(1)) => {}
            other => panic!("expected ReservedNonZero, got {:?}", other),
        }
    }

    #[test]
    fn encode_rejects_oversized_length() {
        let header = Header::new(MessageType::Access, Flags::empty(), MAX_PAYLOAD_SIZE + 1);
        let mut buf = BytesMut::new();
        match header.encode(&mut buf) {
            Err(Error::PayloadTooLarge(_)) => {}
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_does_not_fail_decode() {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Unknown(0x42), Flags::empty(), 0)
            .encode(&mut buf)
            .unwrap();
        let decoded = Header::decode(&buf).unwrap();
        assert_eq!(decoded.message_type, MessageType::Unknown(0x42));
    }

    #[test]
    fn flags_are_idempotent() {
        let mut flags = Flags::empty();
        flags.set(Flags::METRICS);
        flags.set(Flags::METRICS);
        assert!(flags.has(Flags::METRICS));
        flags.clear(Flags::METRICS);
        assert!(!flags.has(Flags::METRICS));
        flags.clear(Flags::METRICS);
        assert!(!flags.has(Flags::METRICS));
    }
}
