//! The framed wire protocol exchanged with the rendezvous server: a fixed
//! header (§header) plus the four typed payloads it introduces.

mod header;
mod metrics;
mod request;
mod response;

pub use header::{Flags, Header, MessageType, HEADER_LEN, MAX_PAYLOAD_SIZE, VERSION};
pub use metrics::Metrics;
pub use request::{Proto, Request};
pub use response::{Response, Status};

/// Every way a header or payload can fail to round-trip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported protocol version {0:#x}")]
    InvalidVersion(u8),

    #[error("payload length {0} exceeds MAX_PAYLOAD_SIZE")]
    PayloadTooLarge(u64),

    #[error("reserved header byte was {0}, expected 0")]
    ReservedNonZero(u8),

    #[error("unknown proto byte {0:#x}")]
    UnknownProto(u8),

    #[error("unknown status byte {0:#x}")]
    UnknownStatus(u8),

    #[error("request name must be 1..=4096 bytes, was empty")]
    EmptyName,

    #[error("declared length {declared} does not match actual length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("string of {len} bytes exceeds the {max} byte limit for this field")]
    StringTooLong { len: usize, max: usize },

    #[error("buffer too short: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}
