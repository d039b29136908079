mod client;
mod config;
mod events;
pub mod runtime;
mod server;
mod transport;

pub use client::ClientRole;
pub use config::{TransportConfig, DEFAULT_MAX_PACKET_BYTES};
pub use events::{ClientEvent, ServerEvent};
pub use runtime::{PacketQueue, ProtocolEngine, RoleHandlers};
pub use server::ServerRole;
pub use transport::{P2PTransport, TransportEvent};
