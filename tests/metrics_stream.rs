mod common;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wormhole::config::ClientConfig;
use wormhole::mux::into_tokio_io;
use wormhole::session::Session;
use wormhole::wire::{Flags, MessageType, Metrics, Proto, Response, Status};

#[tokio::test]
async fn metrics_stream_emits_three_events() {
    let (client_io, mut server) = common::fake_transport();

    let config = ClientConfig {
        proto: Proto::Http,
        name: "alpha".to_string(),
        target_address: "127.0.0.1:1".to_string(),
        address: "unused:443".to_string(),
        with_metrics: true,
        target_tls: false,
    };
    let session = Session::new(config);
    let shutdown = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);

    let client_future = session.handshake_and_serve(client_io, shutdown.clone(), Some(tx));

    let server_future = async {
        let (mut control_stream, header) = common::accept_and_read_header(&mut server).await;
        assert!(header.flags.has(Flags::METRICS));
        let _request_body = common::read_body(&mut control_stream, header.length as usize).await;

        let response = Response::new(Status::Ok, 3600, "alpha.example").unwrap();
        let mut body = BytesMut::new();
        response.encode(&mut body).unwrap();
        common::write_frame(&mut control_stream, MessageType::Response, &body).await;
        drop(control_stream);

        let metrics_stream = server.control.open_stream().await.unwrap();
        let mut metrics_stream = into_tokio_io(metrics_stream);

        for i in 0..3u64 {
            let metrics = Metrics {
                ingress: i,
                egress: i * 2,
                uptime: i * 3,
                connection_count: i,
                active_connections: i as u32,
            };
            let mut body = BytesMut::new();
            metrics.encode(&mut body);
            common::write_frame(&mut metrics_stream, MessageType::Metrics, &body).await;
        }
        drop(metrics_stream);
    };

    let shutdown_after_collection = shutdown.clone();
    let metrics_collection = async move {
        let mut received = Vec::new();
        for _ in 0..3 {
            match rx.recv().await {
                Some(metrics) => received.push(metrics),
                None => break,
            }
        }
        shutdown_after_collection.cancel();
        received
    };

    let (client_result, _, received) = tokio::join!(client_future, server_future, metrics_collection);

    assert!(client_result.is_ok());
    assert_eq!(received.len(), 3);
    for (i, metrics) in received.iter().enumerate() {
        let i = i as u64;
        assert_eq!(metrics.ingress, i);
        assert_eq!(metrics.egress, i * 2);
        assert_eq!(metrics.uptime, i * 3);
        assert_eq!(metrics.connection_count, i);
        assert_eq!(metrics.active_connections, i as u32);
    }
}
