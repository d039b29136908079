mod support;

use std::time::Duration;

use peerlink_p2p::domain::PacketType;
use peerlink_p2p::{
    Channel, ClientConnectionState, ClientEvent, ConnectionId, P2PNetworking, ServerEvent,
    ServerStatus, SessionError, TransportConfig, TransportError,
};
use support::{LoopbackFixture, SETTLE};
use tokio::time::Instant;

fn send_raw(from: &impl P2PNetworking, to: peerlink_p2p::PeerId, bytes: &[u8]) -> bool {
    from.send_packet(to, bytes, Channel::RELIABLE, Channel::RELIABLE.send_mode())
}

#[tokio::test(start_paused = true)]
async fn test_handshake_completes_against_server() {
    let mut fixture = LoopbackFixture::new(1);

    fixture.connect(0).await;

    let host = fixture.host.id();
    let client = fixture.client(0);
    assert_eq!(client.status(), ClientConnectionState::Connected);
    assert_eq!(client.host(), Some(host));
    assert_eq!(client.drain_events(), vec![ClientEvent::Connected]);

    assert_eq!(
        fixture.server.drain_events(),
        vec![ServerEvent::Connected(ConnectionId(0))]
    );
    assert_eq!(fixture.server.status(), ServerStatus::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_connection_ids_follow_accept_order() {
    let mut fixture = LoopbackFixture::new(2);

    fixture.connect_all().await;

    assert_eq!(
        fixture.server.drain_events(),
        vec![
            ServerEvent::Connected(ConnectionId(0)),
            ServerEvent::Connected(ConnectionId(1)),
        ]
    );
    assert_eq!(
        fixture.server.get_address(ConnectionId(0)),
        Some(fixture.client_peer(0).id())
    );
    assert_eq!(
        fixture.server.get_address(ConnectionId(1)),
        Some(fixture.client_peer(1).id())
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_connect_is_rejected() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();

    let host = fixture.host.id();
    assert!(send_raw(fixture.client_peer(0), host, &[PacketType::Connect as u8]));
    fixture.settle(SETTLE).await;

    assert_eq!(fixture.server.connection_count(), 1);
    assert!(fixture.server.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_handshake_times_out_without_reply() {
    let mut fixture = LoopbackFixture::new(1);
    let silent = fixture.network.create_peer();

    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_millis(16_000),
        fixture.client(0).connect_to_id(silent.id()),
    )
    .await;

    assert!(matches!(
        result,
        Ok(Err(TransportError::HandshakeTimeout { .. }))
    ));
    assert!(started.elapsed() >= Duration::from_millis(15_000));

    let client = fixture.client(0);
    assert_eq!(client.status(), ClientConnectionState::Offline);
    assert!(!client.is_active());
    assert!(client.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_data_flows_both_ways() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();
    fixture.client(0).drain_events();

    fixture
        .server
        .send(ConnectionId(0), 1, b"hello client")
        .unwrap();
    fixture.client(0).send(3, b"hello server").unwrap();
    fixture.settle(SETTLE).await;

    assert_eq!(
        fixture.client(0).drain_events(),
        vec![ClientEvent::DataReceived {
            data: b"hello client".to_vec(),
            channel: Channel::UNRELIABLE,
        }]
    );
    assert_eq!(
        fixture.server.drain_events(),
        vec![ServerEvent::DataReceived {
            connection_id: ConnectionId(0),
            data: b"hello server".to_vec(),
            channel: Channel::RELIABLE_BUFFERED,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tag_only_data_never_delivered() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();

    let host = fixture.host.id();
    assert!(send_raw(fixture.client_peer(0), host, &[PacketType::Data as u8]));
    fixture.settle(SETTLE).await;
    assert!(fixture.server.drain_events().is_empty());

    // The connection itself survives
    fixture.client(0).send(0, b"ok").unwrap();
    fixture.settle(SETTLE).await;
    assert_eq!(fixture.server.drain_events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_oversize_packet_dropped() {
    let config = TransportConfig::default().with_max_packet_bytes(64);
    let mut fixture = LoopbackFixture::with_config(1, config);
    fixture.connect(0).await;
    fixture.server.drain_events();

    let host = fixture.host.id();
    let mut oversize = vec![PacketType::Data as u8];
    oversize.extend_from_slice(&[7; 63]);
    assert!(send_raw(fixture.client_peer(0), host, &oversize));
    fixture.settle(SETTLE).await;

    assert!(fixture.server.drain_events().is_empty());
    assert_eq!(fixture.host.inbox_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_packets_from_strangers_ignored() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();

    let stranger = fixture.network.create_peer();
    fixture
        .host
        .inject(stranger.id(), vec![PacketType::Data as u8, 1, 2], Channel::RELIABLE);
    fixture.settle(SETTLE).await;

    assert!(fixture.server.drain_events().is_empty());
    assert_eq!(fixture.server.connection_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_reaches_server() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();

    fixture.client(0).disconnect().unwrap();
    fixture.settle(SETTLE).await;

    assert_eq!(
        fixture.server.drain_events(),
        vec![ServerEvent::Disconnected(ConnectionId(0))]
    );
    assert!(fixture.server.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_server_disconnect_reaches_client() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.client(0).drain_events();

    fixture.server.disconnect(ConnectionId(0)).unwrap();
    fixture.settle(SETTLE).await;

    let client = fixture.client(0);
    assert_eq!(client.drain_events(), vec![ClientEvent::Disconnected]);
    assert_eq!(client.status(), ClientConnectionState::Offline);
    assert_eq!(client.host(), None);
}

#[tokio::test(start_paused = true)]
async fn test_server_stop_notifies_every_client() {
    let mut fixture = LoopbackFixture::new(2);
    fixture.connect_all().await;
    for index in 0..2 {
        fixture.client(index).drain_events();
    }

    fixture.server.stop();
    fixture.settle(SETTLE).await;

    assert_eq!(fixture.server.status(), ServerStatus::Offline);
    for index in 0..2 {
        assert_eq!(
            fixture.client(index).drain_events(),
            vec![ClientEvent::Disconnected]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_connection_failure_surfaces_as_error() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.server.drain_events();
    fixture.client(0).drain_events();

    let host = fixture.host.id();
    let client_id = fixture.client_peer(0).id();
    fixture
        .network
        .report_connection_failure(host, client_id, SessionError::Timeout);
    fixture
        .network
        .report_connection_failure(client_id, host, SessionError::Timeout);
    fixture.settle(SETTLE).await;

    assert_eq!(
        fixture.server.drain_events(),
        vec![ServerEvent::Error {
            connection_id: ConnectionId(0),
            reason: SessionError::Timeout.reason(),
        }]
    );
    assert_eq!(
        fixture.client(0).drain_events(),
        vec![ClientEvent::Error {
            reason: SessionError::Timeout.reason(),
        }]
    );
    assert_eq!(fixture.client(0).status(), ClientConnectionState::Offline);
}

#[tokio::test(start_paused = true)]
async fn test_client_reconnects_with_new_id() {
    let mut fixture = LoopbackFixture::new(1);
    fixture.connect(0).await;
    fixture.client(0).disconnect().unwrap();
    fixture.settle(SETTLE).await;
    fixture.server.drain_events();

    fixture.connect(0).await;

    assert_eq!(
        fixture.server.drain_events(),
        vec![ServerEvent::Connected(ConnectionId(1))]
    );
}
