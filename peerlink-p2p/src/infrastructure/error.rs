use crate::domain::{ConnectionId, InvalidChannel, ParsePeerIdError, PeerId, WireError};

/// Coarse failure class, used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or unauthorised sender; logged and rejected
    Validation,
    /// Handshake budget exhausted
    Timeout,
    /// Platform session accept/close/send failure or reported link failure
    Transport,
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid channel: {0}")]
    InvalidChannel(#[from] InvalidChannel),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] ParsePeerIdError),

    #[error("Invalid peer: {0}")]
    InvalidPeer(PeerId),

    #[error("Request addressed to self ({0})")]
    SelfAddressed(PeerId),

    #[error("Peer already registered: {0}")]
    DuplicatePeer(PeerId),

    #[error("Connection limit reached (max: {max})")]
    RegistryFull { max: usize },

    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    #[error("Packet from unknown sender: {0}")]
    UnknownSender(PeerId),

    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Malformed packet: {0}")]
    Wire(#[from] WireError),

    #[error("Transport is not active")]
    NotActive,

    #[error("Transport is already active")]
    AlreadyActive,

    #[error("Not connected")]
    NotConnected,

    #[error("Handshake timed out after {timeout_ms} ms")]
    HandshakeTimeout { timeout_ms: u64 },

    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Failed to accept session with {0}")]
    AcceptFailed(PeerId),

    #[error("No tokio runtime to run the receive loop on: {0}")]
    NoRuntime(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HandshakeTimeout { .. } => ErrorKind::Timeout,
            Self::SendFailed(_) | Self::AcceptFailed(_) | Self::NoRuntime(_) => {
                ErrorKind::Transport
            }
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
