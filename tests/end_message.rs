mod common;

use bytes::BytesMut;
use tokio_util::sync::CancellationToken;

use wormhole::config::ClientConfig;
use wormhole::session::Session;
use wormhole::wire::{MessageType, Proto, Response, Status};

#[tokio::test]
async fn end_message_closes_the_session() {
    let (client_io, mut server) = common::fake_transport();

    let config = ClientConfig {
        proto: Proto::Http,
        name: "alpha".to_string(),
        target_address: "127.0.0.1:1".to_string(),
        address: "unused:443".to_string(),
        with_metrics: false,
        target_tls: false,
    };
    let session = Session::new(config);
    let shutdown = CancellationToken::new();

    let client_future = session.handshake_and_serve(client_io, shutdown.clone(), None);

    let server_future = async {
        let (mut control_stream, header) = common::accept_and_read_header(&mut server).await;
        let _request_body = common::read_body(&mut control_stream, header.length as usize).await;

        let response = Response::new(Status::Ok, 3600, "alpha.example").unwrap();
        let mut body = BytesMut::new();
        response.encode(&mut body).unwrap();
        common::write_frame(&mut control_stream, MessageType::Response, &body).await;
        drop(control_stream);

        let end_stream = common::open_and_write(&mut server, MessageType::End, &[]).await;
        drop(end_stream);
    };

    let (client_result, _) = tokio::join!(client_future, server_future);
    assert!(client_result.is_ok());
}
