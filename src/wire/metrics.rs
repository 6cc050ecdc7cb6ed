//! The `Metrics` payload: a fixed 36-byte snapshot of a tunnel's counters.

use bytes::{Buf, BufMut, BytesMut};

use super::Error;

/// `Metrics` is fixed-size: no length field to check against the buffer, just
/// this many bytes, every time.
pub const METRICS_SIZE: usize = 36;

/// A single snapshot of a tunnel's traffic counters, as streamed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub ingress: u64,
    pub egress: u64,
    pub uptime: u64,
    pub connection_count: u64,
    pub active_connections: u32,
}

impl Metrics {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(METRICS_SIZE);
        buf.put_u64(self.ingress);
        buf.put_u64(self.egress);
        buf.put_u64(self.uptime);
        buf.put_u64(self.connection_count);
        buf.put_u32(self.active_connections);
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Metrics, Error> {
        if bytes.len() < METRICS_SIZE {
            return Err(Error::Truncated {
                expected: METRICS_SIZE,
                found: bytes.len(),
            });
        }
        Ok(Metrics {
            ingress: bytes.get_u64(),
            egress: bytes.get_u64(),
            uptime: bytes.get_u64(),
            connection_count: bytes.get_u64(),
            active_connections: bytes.get_u32(),
        })
    }
}
