//! The top-level error taxonomy for a client session.

use crate::{framed::FramedError, mux::MuxError, wire};

/// Every way a control session can end abnormally.
///
/// Errors on a single Access stream never escalate to this type (they are
/// local to that forwarder, per §7's policy); only failures on the control
/// stream, the transport itself, or a malformed control-path frame do.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Wire(#[from] wire::Error),

    #[error(transparent)]
    Framed(#[from] FramedError),

    #[error(transparent)]
    Mux(#[from] MuxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The process exit code this error should map to: 0 for dial/protocol
    /// success paths (including the registration-rejected cases, which never
    /// construct a [`ClientError`] at all — see [`crate::session`]), non-zero
    /// for everything that reaches `main` as an `Err`.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
