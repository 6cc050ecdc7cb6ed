//! The control session. Dials the rendezvous server,
//! performs the registration handshake, then runs the dispatcher over
//! whatever streams the server opens until the session ends.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::{rustls, TlsConnector};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ClientConfig;
use crate::dispatch::{self, DispatchContext};
use crate::error::ClientError;
use crate::framed;
use crate::mux::{self, MuxSession};
use crate::wire::{self, Flags, Header, MessageType, Metrics, Request, Response, Status};

/// What a successful handshake recorded, shared with whoever holds a
/// [`Session`] so `domain()` can be queried while `run` is still blocked
/// accepting streams.
#[derive(Debug, Default)]
struct Registered {
    domain: Option<String>,
    expiry: Option<SystemTime>,
}

/// A single client session against one rendezvous server.
///
/// Created fresh for each invocation of `run`; there is no automatic
/// reconnection on failure.
pub struct Session {
    config: ClientConfig,
    registered: Arc<Mutex<Registered>>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Session {
        Session {
            config,
            registered: Arc::new(Mutex::new(Registered::default())),
        }
    }

    /// The domain assigned by the server, once registration has succeeded.
    pub fn domain(&self) -> Option<String> {
        self.registered.lock().unwrap().domain.clone()
    }

    /// Run the session to completion: dial, register, then forward streams
    /// until the transport closes or `shutdown` is triggered.
    ///
    /// `metrics_tx` receives every [`Metrics`] frame the server streams, if
    /// `--metrics` was requested; it is otherwise never used.
    pub async fn run(
        &self,
        shutdown: CancellationToken,
        metrics_tx: Option<mpsc::Sender<Metrics>>,
    ) -> Result<(), ClientError> {
        let (host, port) = split_host_port(&self.config.address)?;

        let tcp = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| ClientError::Dial {
                address: self.config.address.clone(),
                source,
            })?;
        tcp.set_nodelay(true).ok();

        let dns_name = webpki::DNSNameRef::try_from_ascii_str(&host).map_err(|_| {
            ClientError::Protocol(format!("invalid rendezvous hostname: {}", host))
        })?;

        let mut tls_config = rustls::ClientConfig::new();
        tls_config
            .root_store
            .add_server_trust_anchors(&webpki_roots::TLS_SERVER_ROOTS);
        let connector = TlsConnector::from(Arc::new(tls_config));
        let tls_stream =
            connector
                .connect(dns_name, tcp)
                .await
                .map_err(|source| ClientError::Dial {
                    address: self.config.address.clone(),
                    source,
                })?;

        self.handshake_and_serve(tls_stream, shutdown, metrics_tx).await
    }

    /// Everything after the rendezvous TLS connection is established: wrap
    /// it in the multiplexed transport, perform the registration handshake
    /// over a fresh control stream, then dispatch inbound streams until the
    /// transport closes or `shutdown` fires.
    ///
    /// Split out from `run` so tests can drive the handshake and dispatch
    /// loop against a bare duplex pair, without going through a real TLS
    /// dial — TLS library internals are someone else's contract, not this
    /// one's.
    pub async fn handshake_and_serve<T>(
        &self,
        stream: T,
        shutdown: CancellationToken,
        metrics_tx: Option<mpsc::Sender<Metrics>>,
    ) -> Result<(), ClientError>
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let mut session = MuxSession::client(stream);

        let control_stream = session.open_stream().await?;
        let mut control_stream = mux::into_tokio_io(control_stream);

        let request = Request::new(self.config.proto, self.config.name.clone())?;
        let mut body = BytesMut::new();
        request.encode(&mut body)?;

        let mut flags = Flags::empty();
        if self.config.with_metrics {
            flags.set(Flags::METRICS);
        }
        let header = Header::new(MessageType::Request, flags, body.len() as u64);
        let mut header_buf = BytesMut::new();
        header.encode(&mut header_buf)?;

        control_stream.write_all(&header_buf).await?;
        control_stream.write_all(&body).await?;

        let header_bytes = framed::read_exact(&mut control_stream, wire::HEADER_LEN).await?;
        let header = Header::decode(&header_bytes)?;

        match header.message_type {
            MessageType::Error => {
                let body = framed::read_exact(&mut control_stream, header.length as usize).await?;
                let message = String::from_utf8_lossy(&body).into_owned();
                return Err(ClientError::ServerError(message));
            }
            MessageType::Response => {}
            other => {
                return Err(ClientError::Protocol(format!(
                    "expected Response, got {:?}",
                    other
                )))
            }
        }

        let body = framed::read_exact(&mut control_stream, header.length as usize).await?;
        let response = Response::decode(&body)?;
        drop(control_stream);

        match response.status {
            Status::Ok => {
                let expiry = expiry_from_ttl_hours(response.ttl_hours);
                {
                    let mut registered = self.registered.lock().unwrap();
                    registered.domain = Some(response.domain.clone());
                    registered.expiry = Some(expiry);
                }
                info!(
                    "tunnel registered: {}{}",
                    self.config.proto.scheme(),
                    response.domain
                );
            }
            Status::NameTaken => {
                error!("'{}' is already in use", self.config.name);
                return Ok(());
            }
            Status::UnsupportedProto => {
                error!("rendezvous server does not support this protocol");
                return Ok(());
            }
        }

        let ctx = DispatchContext {
            target_address: self.config.target_address.clone(),
            target_tls: self.config.target_tls,
            metrics_tx,
            shutdown: shutdown.clone(),
        };

        tokio::select! {
            result = dispatch::run(session, ctx) => result,
            _ = shutdown.cancelled() => Ok(()),
        }
    }
}

/// `ttlHours` is carried on the wire as nanoseconds-until-expiry rather than
/// actual hours: convert to milliseconds by dividing before adding to the
/// current time, rather than treating the raw value as a span of hours.
fn expiry_from_ttl_hours(ttl_hours: u64) -> SystemTime {
    let ttl_ms = ttl_hours / 1_000_000;
    SystemTime::now() + Duration::from_millis(ttl_ms)
}

fn split_host_port(address: &str) -> Result<(String, u16), ClientError> {
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        ClientError::Protocol(format!("address must be host:port, got {:?}", address))
    })?;
    let port: u16 = port
        .parse()
        .map_err(|_| ClientError::Protocol(format!("invalid port in address {:?}", address)))?;
    Ok((host.to_string(), port))
}
