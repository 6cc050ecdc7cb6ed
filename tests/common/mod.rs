//! A scripted server harness standing in for the rendezvous server: drives
//! the server side of the yamux connection over an in-process duplex pair,
//! so scenario tests never need a real TLS listener.

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::compat::TokioAsyncReadCompatExt;
use yamux::{Config, Connection, Mode};

use wormhole::mux::into_tokio_io;
use wormhole::wire::{Flags, Header, MessageType, HEADER_LEN};

pub const BUFFER_SIZE: usize = 64 * 1024;

/// The server side of a fake transport: a handle to open new streams, and a
/// channel delivering every stream the client opens (the control stream is
/// always first).
pub struct FakeServer {
    pub control: yamux::Control,
    pub streams: mpsc::UnboundedReceiver<yamux::Stream>,
}

/// Build a connected client/server duplex pair and start driving the server
/// side of the yamux protocol over it. Returns the client half (handed to
/// `Session::handshake_and_serve`) and the [`FakeServer`] handle.
pub fn fake_transport() -> (DuplexStream, FakeServer) {
    let (client_io, server_io) = duplex(BUFFER_SIZE);

    let mut connection = Connection::new(server_io.compat(), Config::default(), Mode::Server);
    let control = connection.control();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match connection.next_stream().await {
                Ok(Some(stream)) => {
                    if tx.send(stream).is_err() {
                        break;
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
    });

    (client_io, FakeServer { control, streams: rx })
}

/// Receive the next stream the client opened and read off its header.
pub async fn accept_and_read_header(server: &mut FakeServer) -> (tokio_util::compat::Compat<yamux::Stream>, Header) {
    let stream = server.streams.recv().await.expect("client never opened a stream");
    let mut stream = into_tokio_io(stream);
    let mut header_bytes = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_bytes).await.unwrap();
    let header = Header::decode(&header_bytes).unwrap();
    (stream, header)
}

/// Read exactly `len` bytes of payload following a header already consumed.
pub async fn read_body(stream: &mut tokio_util::compat::Compat<yamux::Stream>, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.unwrap();
    buf
}

/// Write a header followed by a body on `stream`.
pub async fn write_frame(
    stream: &mut tokio_util::compat::Compat<yamux::Stream>,
    message_type: MessageType,
    body: &[u8],
) {
    let header = Header::new(message_type, Flags::empty(), body.len() as u64);
    let mut buf = bytes::BytesMut::new();
    header.encode(&mut buf).unwrap();
    stream.write_all(&buf).await.unwrap();
    stream.write_all(body).await.unwrap();
}

/// Open a new stream from the server side and write a header-only (or
/// header+body) frame on it, e.g. an Access or End stream.
pub async fn open_and_write(
    server: &mut FakeServer,
    message_type: MessageType,
    body: &[u8],
) -> tokio_util::compat::Compat<yamux::Stream> {
    let stream = server.control.open_stream().await.unwrap();
    let mut stream = into_tokio_io(stream);
    write_frame(&mut stream, message_type, body).await;
    stream
}
