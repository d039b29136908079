use crate::domain::{Channel, ConnectionId};

/// Events raised by the server role, keyed by connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
    DataReceived {
        connection_id: ConnectionId,
        data: Vec<u8>,
        channel: Channel,
    },
    Error {
        connection_id: ConnectionId,
        reason: String,
    },
}

/// Events raised by the client role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    DataReceived { data: Vec<u8>, channel: Channel },
    Error { reason: String },
}
