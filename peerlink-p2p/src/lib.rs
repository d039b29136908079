// Domain layer (core)
pub mod domain;

// Application layer (roles and runtime)
pub mod application;

// Infrastructure layer (platform adapters)
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    ClientEvent, ClientRole, P2PTransport, ServerEvent, ServerRole, TransportConfig,
    TransportEvent,
};
pub use domain::{Channel, ClientConnectionState, ConnectionId, PeerId, ServerStatus, SessionError};
pub use infrastructure::error::{ErrorKind, Result, TransportError};
pub use infrastructure::{MemoryNetwork, MemoryPeer, P2PNetworking};
