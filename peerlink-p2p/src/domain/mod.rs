mod channel;
mod peer;
mod registry;
mod session_error;
mod state;
pub mod wire;

pub use channel::{Channel, InvalidChannel, SendMode, CHANNEL_COUNT};
pub use peer::{ConnectionId, ParsePeerIdError, PeerId};
pub use registry::ConnectionRegistry;
pub use session_error::SessionError;
pub use state::{ClientConnectionState, ServerStatus};
pub use wire::{Frame, InboundPacket, PacketType, WireError};
