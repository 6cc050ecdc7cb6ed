//! The forwarder: bridges one Access stream to a connection against the
//! local target the client was pointed at.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::{rustls, TlsConnector};
use tokio_util::compat::Compat;

use crate::defaults::DIAL_TIMEOUT;
use crate::error::ClientError;
use crate::mux::MuxStream;
use crate::wire::{Flags, Header, MessageType};

/// Accepts any certificate the local target presents. Only ever used for the
/// local leg, never the rendezvous connection: the target is usually a
/// service on the same machine with a self-signed or no certificate at all,
/// and there is nothing to pin it against.
struct AcceptAnyCert;

impl rustls::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _roots: &rustls::RootCertStore,
        _presented_certs: &[rustls::Certificate],
        _dns_name: webpki::DNSNameRef,
        _ocsp_response: &[u8],
    ) -> Result<rustls::ServerCertVerified, rustls::TLSError> {
        Ok(rustls::ServerCertVerified::assertion())
    }
}

/// Acknowledge the stream, dial the local target, then splice bytes in both
/// directions until either side closes.
pub async fn run(
    mut stream: Compat<MuxStream>,
    target_address: String,
    target_tls: bool,
) -> Result<(), ClientError> {
    let ack = Header::new(MessageType::Ack, Flags::empty(), 0);
    let mut buf = BytesMut::new();
    ack.encode(&mut buf)?;
    stream.write_all(&buf).await?;

    let target = dial_target(&target_address).await?;

    if target_tls {
        let target = wrap_tls(target, &target_address).await?;
        splice(stream, target).await
    } else {
        splice(stream, target).await
    }
}

async fn dial_target(target_address: &str) -> Result<TcpStream, ClientError> {
    let connect = TcpStream::connect(target_address);
    let target = tokio::time::timeout(DIAL_TIMEOUT, connect)
        .await
        .map_err(|_| ClientError::Dial {
            address: target_address.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timed out"),
        })?
        .map_err(|source| ClientError::Dial {
            address: target_address.to_string(),
            source,
        })?;
    target.set_nodelay(true).ok();
    Ok(target)
}

async fn wrap_tls(
    target: TcpStream,
    target_address: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ClientError> {
    let mut config = rustls::ClientConfig::new();
    config
        .dangerous()
        .set_certificate_verifier(Arc::new(AcceptAnyCert));
    let connector = TlsConnector::from(Arc::new(config));

    // The server name sent over SNI is irrelevant once the verifier accepts
    // anything, but rustls still requires a syntactically valid one.
    let dns_name = webpki::DNSNameRef::try_from_ascii_str("localhost")
        .expect("\"localhost\" is a valid DNS name");

    connector
        .connect(dns_name, target)
        .await
        .map_err(|source| ClientError::Dial {
            address: target_address.to_string(),
            source,
        })
}

async fn splice<A, B>(mut a: A, mut b: B) -> Result<(), ClientError>
where
    A: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    B: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    tokio::io::copy_bidirectional(&mut a, &mut b).await?;
    Ok(())
}
