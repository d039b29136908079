use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of parallel delivery lanes
pub const CHANNEL_COUNT: usize = 4;

/// Platform send mode a channel maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SendMode {
    /// Unreliable, may be dropped or reordered
    Unreliable,
    /// Unreliable, sent immediately without waiting for a session
    UnreliableNoDelay,
    /// Reliable and ordered
    Reliable,
    /// Reliable, with small payloads coalesced before sending
    ReliableWithBuffering,
}

/// One of the four delivery lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel(u8);

impl Channel {
    pub const RELIABLE: Channel = Channel(0);
    pub const UNRELIABLE: Channel = Channel(1);
    pub const UNRELIABLE_NO_DELAY: Channel = Channel(2);
    pub const RELIABLE_BUFFERED: Channel = Channel(3);

    /// All lanes in receive order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Self::RELIABLE,
        Self::UNRELIABLE,
        Self::UNRELIABLE_NO_DELAY,
        Self::RELIABLE_BUFFERED,
    ];

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn send_mode(&self) -> SendMode {
        match self.0 {
            0 => SendMode::Reliable,
            1 => SendMode::Unreliable,
            2 => SendMode::UnreliableNoDelay,
            _ => SendMode::ReliableWithBuffering,
        }
    }
}

/// Raised for a channel index outside `0..CHANNEL_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("channel {0} out of range (0..{CHANNEL_COUNT})")]
pub struct InvalidChannel(pub u8);

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if (index as usize) < CHANNEL_COUNT {
            Ok(Channel(index))
        } else {
            Err(InvalidChannel(index))
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
