use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::{Channel, PeerId, SendMode, SessionError};

/// Handle returned by [`SessionCallbackSource::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Asynchronous notifications pushed by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCallback {
    /// A remote peer wants to open a session with us
    SessionRequest(PeerId),
    /// An established or pending session with `peer` broke
    ConnectionFailed { peer: PeerId, error: SessionError },
}

/// A packet as the platform hands it over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub sender: PeerId,
    pub data: Vec<u8>,
}

/// Source of platform callbacks
pub trait SessionCallbackSource {
    fn subscribe(&self) -> (SubscriptionId, UnboundedReceiver<SessionCallback>);
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Session-oriented P2P layer exposed by the platform SDK (allows mocking in tests)
///
/// Every method is non-blocking. Packets are pulled per channel; session
/// requests and failures are pushed through [`SessionCallbackSource`].
pub trait P2PNetworking: SessionCallbackSource + Send + Sync + 'static {
    fn local_peer_id(&self) -> PeerId;
    fn accept_session(&self, peer: PeerId) -> bool;
    fn close_session(&self, peer: PeerId) -> bool;
    fn send_packet(&self, peer: PeerId, data: &[u8], channel: Channel, mode: SendMode) -> bool;
    fn is_packet_available(&self, channel: Channel) -> bool;
    fn read_packet(&self, channel: Channel) -> Option<RawPacket>;
}
