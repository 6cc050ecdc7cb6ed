//! Read exactly N bytes from a byte-stream, or fail — the contract
//! of every header and payload read.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// The framed reader's own failure modes, kept separate from [`crate::wire::Error`]
/// (a framing failure is about the transport, not about the bytes it carried).
#[derive(Debug, thiserror::Error)]
pub enum FramedError {
    #[error("peer closed the stream after {read} of {expected} expected bytes")]
    UnexpectedEof { expected: usize, read: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read exactly `len` bytes from `reader`, concatenating arrivals until
/// satisfied. Never reads more than `len` bytes from the stream.
pub async fn read_exact<R: AsyncRead + Unpin>(
    reader: &mut R,
    len: usize,
) -> Result<Bytes, FramedError> {
    if len == 0 {
        return Ok(Bytes::new());
    }
    let mut buf = BytesMut::with_capacity(len);
    buf.resize(len, 0);
    let mut read = 0;
    while read < len {
        let n = reader.read(&mut buf[read..]).await?;
        if n == 0 {
            return Err(FramedError::UnexpectedEof { expected: len, read });
        }
        read += n;
    }
    Ok(buf.freeze())
}
