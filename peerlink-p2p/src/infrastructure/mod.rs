pub mod error;
pub mod memory;
pub mod networking;

pub use memory::{MemoryNetwork, MemoryPeer};
pub use networking::{
    P2PNetworking, RawPacket, SessionCallback, SessionCallbackSource, SubscriptionId,
};
