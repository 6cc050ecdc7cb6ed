//! The metrics consumer: drains the dedicated stream the server opens when
//! a client registers with `--metrics`, publishing each snapshot.

use tokio::sync::mpsc;
use tokio_util::compat::Compat;
use tracing::debug;

use crate::error::ClientError;
use crate::framed::{self, FramedError};
use crate::mux::MuxStream;
use crate::wire::{self, Header, MessageType, Metrics};

/// Read `Metrics` frames off `stream` until it closes, publishing each to
/// `tx`. Returns quietly on a clean stream close; a frame that fails to
/// decode, or arrives as the wrong message type, ends the stream too, since
/// there is no way to resynchronize with a corrupt or unexpected payload.
pub async fn consume(
    mut stream: Compat<MuxStream>,
    tx: Option<mpsc::Sender<Metrics>>,
) -> Result<(), ClientError> {
    loop {
        let header_bytes = match framed::read_exact(&mut stream, wire::HEADER_LEN).await {
            Ok(bytes) => bytes,
            Err(FramedError::UnexpectedEof { .. }) => return Ok(()),
            Err(err) => return Err(ClientError::Framed(err)),
        };
        let header = Header::decode(&header_bytes)?;
        if header.message_type != MessageType::Metrics {
            debug!(
                "metrics stream received unexpected message type {:?}",
                header.message_type
            );
            return Ok(());
        }

        let body = framed::read_exact(&mut stream, header.length as usize).await?;
        let metrics = Metrics::decode(&body)?;

        if let Some(tx) = &tx {
            if tx.send(metrics).await.is_err() {
                // Receiver dropped; nothing left to do with further frames.
                return Ok(());
            }
        }
    }
}
