//! The stream dispatcher: classifies every stream the rendezvous server
//! opens on the control transport and routes it to the handler that owns
//! that message type.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::forward;
use crate::framed::{self, FramedError};
use crate::metrics as metrics_consumer;
use crate::mux::{self, MuxError, MuxSession, MuxStream};
use crate::wire::{self, Header, MessageType, Metrics};

/// Per-session configuration every dispatched stream needs; cheap to clone
/// since each accepted stream is handled on its own spawned task.
#[derive(Clone)]
pub struct DispatchContext {
    pub target_address: String,
    pub target_tls: bool,
    pub metrics_tx: Option<mpsc::Sender<Metrics>>,
    pub shutdown: CancellationToken,
}

/// Accept streams from `session` until the transport closes, spawning a
/// handler for each. Returns once the peer closes the underlying connection
/// (`Ok`) or the connection itself fails (`Err`); a failure on any individual
/// stream stays local to that stream's task and never reaches here.
pub async fn run<T>(session: MuxSession<T>, ctx: DispatchContext) -> Result<(), ClientError>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let mut incoming = Box::pin(session.incoming());

    while let Some(result) = incoming.next().await {
        let stream = match result {
            Ok(stream) => stream,
            Err(MuxError::Closed) => break,
            Err(err) => return Err(ClientError::Mux(err)),
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatch_one(stream, ctx).await {
                debug!("stream ended: {}", err);
            }
        });
    }
    Ok(())
}

async fn dispatch_one(stream: MuxStream, ctx: DispatchContext) -> Result<(), ClientError> {
    let mut stream = mux::into_tokio_io(stream);

    let header_bytes = match framed::read_exact(&mut stream, wire::HEADER_LEN).await {
        Ok(bytes) => bytes,
        // A stream that opens and closes with no header ever read is the
        // keep-alive probe, or simply the peer hanging up; neither is worth
        // logging.
        Err(FramedError::UnexpectedEof { .. }) => return Ok(()),
        Err(err) => return Err(ClientError::Framed(err)),
    };
    let header = Header::decode(&header_bytes)?;

    match header.message_type {
        MessageType::Access => {
            forward::run(stream, ctx.target_address, ctx.target_tls).await
        }
        MessageType::Metrics => metrics_consumer::consume(stream, ctx.metrics_tx).await,
        MessageType::End => {
            info!("tunnel timed out");
            ctx.shutdown.cancel();
            Ok(())
        }
        other => {
            debug!("closing stream with unexpected message type {:?}", other);
            Ok(())
        }
    }
}
