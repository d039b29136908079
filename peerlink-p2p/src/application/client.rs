use std::sync::Arc;

use tokio::time::{sleep, Instant};

use crate::application::config::TransportConfig;
use crate::application::events::ClientEvent;
use crate::application::runtime::{ActiveFlag, ProtocolEngine, RoleHandlers};
use crate::domain::wire::{self, PacketType};
use crate::domain::{Channel, ClientConnectionState, PeerId, SessionError, WireError};
use crate::infrastructure::error::{Result, TransportError};
use crate::infrastructure::networking::P2PNetworking;

/// Client-side handler state
struct ClientState<N: P2PNetworking> {
    network: Arc<N>,
    local: PeerId,
    host: Option<PeerId>,
    status: ClientConnectionState,
    active: ActiveFlag,
    pending_events: Vec<ClientEvent>,
}

impl<N: P2PNetworking> ClientState<N> {
    fn is_host(&self, peer: PeerId) -> bool {
        peer.is_valid() && self.host == Some(peer)
    }

    /// Forget the host and close its session
    fn drop_host(&mut self) -> Option<PeerId> {
        let host = self.host.take()?;
        if !self.network.close_session(host) {
            tracing::debug!("No platform session to close for {}", host);
        }
        Some(host)
    }

    /// Back to OFFLINE so a new `connect` can run
    fn go_offline(&mut self) {
        self.status = ClientConnectionState::Offline;
        self.active.set(false);
    }
}

impl<N: P2PNetworking> RoleHandlers for ClientState<N> {
    fn is_known_sender(&self, peer: PeerId) -> bool {
        self.is_host(peer)
    }

    fn on_session_request(&mut self, peer: PeerId) -> Result<()> {
        if self.host.is_some() || !peer.is_valid() || peer == self.local {
            tracing::warn!("🚫 Rejecting session request from {}", peer);
            return Ok(());
        }

        if !self.network.accept_session(peer) {
            return Err(TransportError::AcceptFailed(peer));
        }

        tracing::info!("🤝 Accepted session from host {}", peer);
        self.host = Some(peer);
        Ok(())
    }

    fn on_data(&mut self, _peer: PeerId, data: Vec<u8>, channel: Channel) -> Result<()> {
        tracing::trace!("📥 {} bytes from host on {}", data.len(), channel);
        self.pending_events
            .push(ClientEvent::DataReceived { data, channel });
        Ok(())
    }

    /// A remote DISCONNECT also takes the client offline, as a connection
    /// failure does, so a later `connect` can run.
    fn on_disconnect(&mut self, peer: PeerId) -> Result<()> {
        if !self.is_host(peer) {
            tracing::debug!("Ignoring disconnect from non-host {}", peer);
            return Ok(());
        }

        self.drop_host();
        self.go_offline();
        tracing::info!("👋 Host {} closed the connection", peer);
        self.pending_events.push(ClientEvent::Disconnected);
        Ok(())
    }

    fn on_connection_failed(&mut self, peer: PeerId, error: SessionError) -> Result<()> {
        if !self.is_host(peer) {
            tracing::debug!("Ignoring connection failure for non-host {}", peer);
            return Ok(());
        }

        self.drop_host();
        self.go_offline();
        tracing::error!("❌ Connection to host {} failed: {}", peer, error);
        self.pending_events.push(ClientEvent::Error {
            reason: error.reason(),
        });
        Ok(())
    }
}

/// Connects to a single host
pub struct ClientRole<N: P2PNetworking> {
    engine: ProtocolEngine<N>,
    state: ClientState<N>,
}

impl<N: P2PNetworking> ClientRole<N> {
    pub fn new(network: Arc<N>, config: TransportConfig) -> Self {
        let engine = ProtocolEngine::new(network.clone(), config);
        let state = ClientState {
            local: network.local_peer_id(),
            network,
            host: None,
            status: ClientConnectionState::Offline,
            active: engine.active_flag(),
            pending_events: Vec::new(),
        };

        Self { engine, state }
    }

    /// Connect to a host given as a decimal peer address
    pub async fn connect(&mut self, address: &str) -> Result<()> {
        let host: PeerId = address.parse()?;
        self.connect_to_id(host).await
    }

    /// Send CONNECT to `host` and wait for CONNECTION_ACCEPTED.
    ///
    /// On timeout or a rejected handshake the client is back to OFFLINE and
    /// no `Connected` event is raised.
    pub async fn connect_to_id(&mut self, host: PeerId) -> Result<()> {
        if self.engine.is_active() || self.state.status != ClientConnectionState::Offline {
            return Err(TransportError::AlreadyActive);
        }
        if !host.is_valid() {
            return Err(TransportError::InvalidPeer(host));
        }
        if host == self.state.local {
            return Err(TransportError::SelfAddressed(host));
        }

        self.engine.activate()?;
        self.state.status = ClientConnectionState::Connecting;
        tracing::info!("🔌 Connecting to {}", host);

        let outcome = match self.engine.send_control(host, PacketType::Connect) {
            Ok(()) => self.await_acceptance(host).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            tracing::warn!("❌ Connect to {} failed: {}", host, e);
            self.reset();
            return Err(e);
        }

        self.state.status = ClientConnectionState::Connected;
        // Anything queued before the handshake finished is stale
        self.engine.queue().clear();
        self.state.host = Some(host);

        tracing::info!("✅ Connected to {}", host);
        self.state.pending_events.push(ClientEvent::Connected);
        Ok(())
    }

    async fn await_acceptance(&self, host: PeerId) -> Result<()> {
        let config = self.engine.config();
        let deadline = Instant::now() + config.timeout();
        let queue = self.engine.queue();

        loop {
            while let Some(packet) = queue.dequeue() {
                if packet.sender != host {
                    tracing::debug!("Ignoring packet from {} while connecting", packet.sender);
                    continue;
                }

                return match wire::decode(&packet.payload) {
                    Ok(frame) if frame.kind == PacketType::ConnectionAccepted => Ok(()),
                    Ok(frame) => Err(TransportError::HandshakeRejected(format!(
                        "expected CONNECTION_ACCEPTED, got {:?}",
                        frame.kind
                    ))),
                    Err(e) => Err(TransportError::HandshakeRejected(e.to_string())),
                };
            }

            if Instant::now() >= deadline {
                return Err(TransportError::HandshakeTimeout {
                    timeout_ms: config.timeout_ms,
                });
            }
            sleep(config.tick()).await;
        }
    }

    /// Close the connection to the host and emit `Disconnected`
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(host) = self.connected_host() else {
            return Err(TransportError::NotConnected);
        };

        if let Err(e) = self.engine.send_control(host, PacketType::Disconnect) {
            tracing::debug!("Could not notify host {}: {}", host, e);
        }
        if self.state.drop_host().is_none() {
            tracing::debug!("Host already gone");
        }

        self.reset();
        tracing::info!("👋 Disconnected from {}", host);
        self.state.pending_events.push(ClientEvent::Disconnected);
        Ok(())
    }

    /// Leave any state: disconnect if connected, otherwise just stop
    pub fn close(&mut self) {
        if self.connected_host().is_some() {
            // Only fails when not connected
            let _ = self.disconnect();
        } else {
            self.reset();
        }
    }

    /// Send `data` to the host on the given channel index
    pub fn send(&mut self, channel: u8, data: &[u8]) -> Result<()> {
        let host = self.connected_host().ok_or(TransportError::NotConnected)?;
        let channel = Channel::try_from(channel)?;

        if data.is_empty() {
            return Err(WireError::EmptyData.into());
        }

        self.engine.send(host, PacketType::Data, data, channel)
    }

    /// Dispatch platform callbacks and queued packets
    pub fn process_messages(&mut self) -> Result<usize> {
        let result = self.engine.process_messages(&mut self.state);

        // A handler took the client offline
        if !self.engine.is_active() {
            self.engine.deactivate();
        }
        result
    }

    pub fn drain_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.state.pending_events)
    }

    pub fn status(&self) -> ClientConnectionState {
        self.state.status
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    pub fn is_connected(&self) -> bool {
        self.connected_host().is_some()
    }

    pub fn host(&self) -> Option<PeerId> {
        self.state.host
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.state.local
    }

    pub fn config(&self) -> &TransportConfig {
        self.engine.config()
    }

    fn connected_host(&self) -> Option<PeerId> {
        match (self.state.status, self.state.host) {
            (ClientConnectionState::Connected, Some(host)) if host.is_valid() => Some(host),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.engine.deactivate();
        self.state.status = ClientConnectionState::Offline;
        self.state.host = None;
    }
}

impl<N: P2PNetworking> Drop for ClientRole<N> {
    fn drop(&mut self) {
        self.close();
    }
}
