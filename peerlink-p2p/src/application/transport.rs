use std::sync::Arc;

use crate::application::client::ClientRole;
use crate::application::config::TransportConfig;
use crate::application::events::{ClientEvent, ServerEvent};
use crate::application::server::ServerRole;
use crate::domain::ConnectionId;
use crate::infrastructure::error::TransportError;
use crate::infrastructure::networking::P2PNetworking;

/// Event surfaced by whichever role the transport is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Server(ServerEvent),
    Client(ClientEvent),
}

enum Role<N: P2PNetworking> {
    Idle,
    Server(ServerRole<N>),
    Client(ClientRole<N>),
}

/// Upstream-facing adapter: runs one role at a time and reports outcomes as
/// `bool`/`Option`, logging the underlying error.
pub struct P2PTransport<N: P2PNetworking> {
    network: Arc<N>,
    config: TransportConfig,
    role: Role<N>,
    pending_events: Vec<TransportEvent>,
}

impl<N: P2PNetworking> P2PTransport<N> {
    pub fn new(network: Arc<N>, config: TransportConfig) -> Self {
        Self {
            network,
            config,
            role: Role::Idle,
            pending_events: Vec::new(),
        }
    }

    /// Start hosting. Fails if a role is already running.
    pub fn start_server(&mut self) -> bool {
        if !self.is_idle() {
            tracing::warn!("🚫 start_server: {}", TransportError::AlreadyActive);
            return false;
        }

        let mut server = ServerRole::new(self.network.clone(), self.config.clone());
        let started = report("start_server", server.start());
        if started {
            self.role = Role::Server(server);
        }
        started
    }

    /// Connect to a host at `target_address`, waiting up to the handshake budget
    pub async fn connect(&mut self, target_address: &str) -> bool {
        if !self.is_idle() {
            tracing::warn!("🚫 connect: {}", TransportError::AlreadyActive);
            return false;
        }

        self.take_role_events();
        let mut client = ClientRole::new(self.network.clone(), self.config.clone());
        let connected = report("connect", client.connect(target_address).await);
        if connected {
            self.role = Role::Client(client);
        }
        connected
    }

    /// Send on a connection. Clients ignore `connection_id`.
    pub fn send(&mut self, connection_id: ConnectionId, channel: u8, data: &[u8]) -> bool {
        match &mut self.role {
            Role::Server(server) => report("send", server.send(connection_id, channel, data)),
            Role::Client(client) => report("send", client.send(channel, data)),
            Role::Idle => {
                tracing::warn!("🚫 send: {}", TransportError::NotActive);
                false
            }
        }
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        match &mut self.role {
            Role::Server(server) => report("disconnect", server.disconnect(connection_id)),
            Role::Client(client) => report("disconnect", client.disconnect()),
            Role::Idle => false,
        }
    }

    /// Peer address behind a connection (the host, for a client)
    pub fn get_address(&self, connection_id: ConnectionId) -> Option<String> {
        let peer = match &self.role {
            Role::Server(server) => server.get_address(connection_id),
            Role::Client(client) => client.host(),
            Role::Idle => None,
        };
        peer.map(|peer| peer.to_string())
    }

    pub fn is_active(&self) -> bool {
        match &self.role {
            Role::Server(server) => server.is_active(),
            Role::Client(client) => client.is_active(),
            Role::Idle => false,
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self.role, Role::Server(_))
    }

    /// Run one dispatch pass; call once per outer tick
    pub fn process_messages(&mut self) -> bool {
        match &mut self.role {
            Role::Server(server) => report("process_messages", server.process_messages()),
            Role::Client(client) => report("process_messages", client.process_messages()),
            Role::Idle => true,
        }
    }

    pub fn drain_events(&mut self) -> Vec<TransportEvent> {
        self.take_role_events();
        std::mem::take(&mut self.pending_events)
    }

    /// Stop whichever role is running and return to idle
    pub fn shutdown(&mut self) {
        match &mut self.role {
            Role::Server(server) => server.stop(),
            Role::Client(client) => client.close(),
            Role::Idle => return,
        }

        self.take_role_events();
        self.role = Role::Idle;
        tracing::info!("🛑 Transport shut down");
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// A client that went offline counts as idle so it can reconnect
    fn is_idle(&self) -> bool {
        match &self.role {
            Role::Idle => true,
            Role::Server(_) => false,
            Role::Client(client) => !client.is_active(),
        }
    }

    fn take_role_events(&mut self) {
        match &mut self.role {
            Role::Server(server) => self
                .pending_events
                .extend(server.drain_events().into_iter().map(TransportEvent::Server)),
            Role::Client(client) => self
                .pending_events
                .extend(client.drain_events().into_iter().map(TransportEvent::Client)),
            Role::Idle => {}
        }
    }
}

fn report(operation: &str, result: crate::infrastructure::error::Result<impl Sized>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("⚠️ {} failed ({:?}): {}", operation, e.kind(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, PacketType};
    use crate::infrastructure::{MemoryNetwork, MemoryPeer};

    fn transport() -> (P2PTransport<MemoryPeer>, MemoryPeer, MemoryNetwork) {
        let network = MemoryNetwork::new();
        let peer = network.create_peer();
        let transport = P2PTransport::new(Arc::new(peer.clone()), TransportConfig::default());
        (transport, peer, network)
    }

    #[test]
    fn test_start_server_without_runtime_is_false() {
        let (mut transport, peer, _network) = transport();

        assert!(!transport.start_server());
        assert!(!transport.is_active());
        assert!(!transport.is_server());
        assert_eq!(peer.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_start_server_rejects_invalid_config() {
        let network = MemoryNetwork::new();
        let peer = network.create_peer();
        let config = TransportConfig::default().with_tick_rate(0);
        let mut transport = P2PTransport::new(Arc::new(peer), config);

        assert!(!transport.start_server());
        assert!(!transport.is_active());
    }

    #[tokio::test]
    async fn test_idle_transport() {
        let (mut transport, _peer, _network) = transport();

        assert!(!transport.is_active());
        assert!(!transport.send(ConnectionId(0), 0, b"x"));
        assert!(!transport.disconnect(ConnectionId(0)));
        assert_eq!(transport.get_address(ConnectionId(0)), None);
        assert!(transport.process_messages());
        assert!(transport.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_one_role_at_a_time() {
        let (mut transport, _peer, _network) = transport();

        assert!(transport.start_server());
        assert!(transport.is_server());
        assert!(!transport.start_server());
        assert!(!transport.connect("76561197960265999").await);

        transport.shutdown();
        assert!(!transport.is_active());
        assert!(transport.start_server());
    }

    #[tokio::test]
    async fn test_bad_address_is_false() {
        let (mut transport, _peer, _network) = transport();

        assert!(!transport.connect("").await);
        assert!(!transport.connect("0").await);
        assert!(!transport.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_events_pass_through() {
        let (mut transport, peer, network) = transport();
        let host = network.create_peer();
        peer.inject(host.id(), vec![PacketType::ConnectionAccepted as u8], Channel::RELIABLE);

        assert!(transport.connect(&host.id().to_string()).await);
        assert_eq!(
            transport.get_address(ConnectionId(0)),
            Some(host.id().to_string())
        );

        transport.shutdown();
        assert_eq!(
            transport.drain_events(),
            vec![
                TransportEvent::Client(ClientEvent::Connected),
                TransportEvent::Client(ClientEvent::Disconnected),
            ]
        );
    }
}
