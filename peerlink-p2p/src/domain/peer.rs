use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain entity: opaque 64-bit platform address of a remote endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Distinguished "no peer" address
    pub const INVALID: PeerId = PeerId(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PeerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Error returned when a target address cannot be turned into a peer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid peer address: {0:?}")]
pub struct ParsePeerIdError(pub String);

impl FromStr for PeerId {
    type Err = ParsePeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| ParsePeerIdError(s.to_string()))?;

        let peer = PeerId(raw);
        if !peer.is_valid() {
            return Err(ParsePeerIdError(s.to_string()));
        }
        Ok(peer)
    }
}

/// Process-local handle for one logical connection.
///
/// Allocated by the server from a monotonic counter starting at 0. Ids are
/// never reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
