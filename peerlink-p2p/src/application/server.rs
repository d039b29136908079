use std::sync::Arc;

use crate::application::config::TransportConfig;
use crate::application::events::ServerEvent;
use crate::application::runtime::{send_control, ProtocolEngine, RoleHandlers};
use crate::domain::{
    Channel, ConnectionId, ConnectionRegistry, PacketType, PeerId, ServerStatus, SessionError,
    WireError,
};
use crate::infrastructure::error::{Result, TransportError};
use crate::infrastructure::networking::P2PNetworking;

/// Server-side handler state, driven serially by the dispatch pass
struct ServerState<N: P2PNetworking> {
    network: Arc<N>,
    local: PeerId,
    registry: ConnectionRegistry,
    next_connection: u64,
    status: ServerStatus,
    pending_events: Vec<ServerEvent>,
}

impl<N: P2PNetworking> ServerState<N> {
    /// Unregister a peer and close its session, returning its connection id
    fn release(&mut self, peer: PeerId) -> Option<ConnectionId> {
        if !peer.is_valid() || peer == self.local {
            tracing::warn!("🚫 Ignoring release request for {}", peer);
            return None;
        }

        let Some(connection_id) = self.registry.remove_by_peer(peer) else {
            tracing::debug!("Peer {} is not registered", peer);
            return None;
        };

        if !self.network.close_session(peer) {
            tracing::debug!("No platform session to close for {}", peer);
        }
        Some(connection_id)
    }
}

impl<N: P2PNetworking> RoleHandlers for ServerState<N> {
    fn is_known_sender(&self, peer: PeerId) -> bool {
        self.registry.contains_peer(peer)
    }

    fn on_session_request(&mut self, peer: PeerId) -> Result<()> {
        if !peer.is_valid() || peer == self.local {
            tracing::warn!("🚫 Rejecting session request from {}", peer);
            return Ok(());
        }

        if self.registry.contains_peer(peer) {
            tracing::debug!("Duplicate session request from {}", peer);
            return Ok(());
        }

        if self.registry.len() >= self.registry.capacity() {
            // Drops whatever the platform is holding for this peer
            self.network.close_session(peer);
            return Err(TransportError::RegistryFull {
                max: self.registry.capacity(),
            });
        }

        let connection_id = ConnectionId::new(self.next_connection);
        self.next_connection += 1;

        if !self.registry.add(peer, connection_id) {
            return Err(TransportError::DuplicatePeer(peer));
        }

        if !self.network.accept_session(peer) {
            self.registry.remove(peer, connection_id);
            self.pending_events.push(ServerEvent::Error {
                connection_id,
                reason: format!("failed to accept session with {}", peer),
            });
            return Err(TransportError::AcceptFailed(peer));
        }

        if let Err(e) = send_control(self.network.as_ref(), peer, PacketType::ConnectionAccepted) {
            tracing::warn!("⚠️ Could not confirm connection {}: {}", connection_id, e);
        }

        tracing::info!("✅ Peer {} connected as {}", peer, connection_id);
        self.pending_events
            .push(ServerEvent::Connected(connection_id));
        Ok(())
    }

    fn on_data(&mut self, peer: PeerId, data: Vec<u8>, channel: Channel) -> Result<()> {
        let connection_id = self
            .registry
            .connection_id(peer)
            .ok_or(TransportError::UnknownSender(peer))?;

        tracing::trace!("📥 {} bytes from {} on {}", data.len(), connection_id, channel);
        self.pending_events.push(ServerEvent::DataReceived {
            connection_id,
            data,
            channel,
        });
        Ok(())
    }

    fn on_disconnect(&mut self, peer: PeerId) -> Result<()> {
        if let Some(connection_id) = self.release(peer) {
            tracing::info!("👋 Peer {} ({}) disconnected", peer, connection_id);
            self.pending_events
                .push(ServerEvent::Disconnected(connection_id));
        }
        Ok(())
    }

    fn on_connection_failed(&mut self, peer: PeerId, error: SessionError) -> Result<()> {
        if let Some(connection_id) = self.release(peer) {
            tracing::error!("❌ Connection {} to {} failed: {}", connection_id, peer, error);
            self.pending_events.push(ServerEvent::Error {
                connection_id,
                reason: error.reason(),
            });
        }
        Ok(())
    }
}

/// Accepts sessions from many peers and maps them to connection ids
pub struct ServerRole<N: P2PNetworking> {
    engine: ProtocolEngine<N>,
    state: ServerState<N>,
}

impl<N: P2PNetworking> ServerRole<N> {
    pub fn new(network: Arc<N>, config: TransportConfig) -> Self {
        let state = ServerState {
            local: network.local_peer_id(),
            network: network.clone(),
            registry: ConnectionRegistry::new(config.max_connections),
            next_connection: 0,
            status: ServerStatus::Offline,
            pending_events: Vec::new(),
        };

        Self {
            engine: ProtocolEngine::new(network, config),
            state,
        }
    }

    /// Start listening; spawns the receive loop
    pub fn start(&mut self) -> Result<()> {
        self.engine.activate()?;
        self.state.status = ServerStatus::Listening;
        tracing::info!("🚀 Server listening on {}", self.state.local);
        Ok(())
    }

    /// Stop listening and close every session. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.engine.is_active() && self.state.status == ServerStatus::Offline {
            return;
        }

        self.state.status = ServerStatus::Offline;
        self.engine.deactivate();

        let peers: Vec<PeerId> = self.state.registry.peers().copied().collect();
        for peer in &peers {
            if let Err(e) = self.engine.send_control(*peer, PacketType::Disconnect) {
                tracing::debug!("Could not notify {}: {}", peer, e);
            }
            self.state.network.close_session(*peer);
        }
        self.state.registry.clear();

        tracing::info!("🛑 Server stopped ({} sessions closed)", peers.len());
    }

    /// Send `data` to a connection on the given channel index
    pub fn send(&mut self, connection_id: ConnectionId, channel: u8, data: &[u8]) -> Result<()> {
        if !self.engine.is_active() {
            return Err(TransportError::NotActive);
        }

        let channel = Channel::try_from(channel)?;
        let peer = self
            .state
            .registry
            .peer(connection_id)
            .ok_or(TransportError::UnknownConnection(connection_id))?;

        if data.is_empty() {
            return Err(WireError::EmptyData.into());
        }

        self.engine.send(peer, PacketType::Data, data, channel)
    }

    /// Close one connection and emit `Disconnected`
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<()> {
        let peer = self
            .state
            .registry
            .peer(connection_id)
            .ok_or(TransportError::UnknownConnection(connection_id))?;

        if let Err(e) = self.engine.send_control(peer, PacketType::Disconnect) {
            tracing::debug!("Could not notify {}: {}", peer, e);
        }

        self.state.registry.remove(peer, connection_id);
        self.state.network.close_session(peer);

        tracing::info!("👋 Disconnected {} ({})", connection_id, peer);
        self.state
            .pending_events
            .push(ServerEvent::Disconnected(connection_id));
        Ok(())
    }

    pub fn get_address(&self, connection_id: ConnectionId) -> Option<PeerId> {
        self.state.registry.peer(connection_id)
    }

    pub fn connection_id(&self, peer: PeerId) -> Option<ConnectionId> {
        self.state.registry.connection_id(peer)
    }

    /// Dispatch platform callbacks and queued packets
    pub fn process_messages(&mut self) -> Result<usize> {
        self.engine.process_messages(&mut self.state)
    }

    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        std::mem::take(&mut self.state.pending_events)
    }

    pub fn status(&self) -> ServerStatus {
        self.state.status
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    pub fn connection_count(&self) -> usize {
        self.state.registry.len()
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.state.local
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.state.registry
    }

    pub fn config(&self) -> &TransportConfig {
        self.engine.config()
    }
}

impl<N: P2PNetworking> Drop for ServerRole<N> {
    fn drop(&mut self) {
        self.stop();
    }
}
