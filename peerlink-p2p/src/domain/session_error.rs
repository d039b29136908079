use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code the platform attaches to a failed P2P session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionError {
    None,
    /// Target is not running the same app
    NotRunningApp,
    /// Local user does not own the app
    NoRightsToApp,
    /// Target is not connected to the platform backend
    DestinationNotLoggedIn,
    /// Target did not respond
    Timeout,
    Unknown(u8),
}

impl SessionError {
    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::NotRunningApp => 1,
            Self::NoRightsToApp => 2,
            Self::DestinationNotLoggedIn => 3,
            Self::Timeout => 4,
            Self::Unknown(code) => *code,
        }
    }

    /// Human-readable reason carried by `Error` events
    pub fn reason(&self) -> String {
        match self {
            Self::None => "no error reported".to_string(),
            Self::NotRunningApp => "target is not running the same app".to_string(),
            Self::NoRightsToApp => "local user does not own the app".to_string(),
            Self::DestinationNotLoggedIn => "target is not logged in".to_string(),
            Self::Timeout => "connection attempt timed out".to_string(),
            Self::Unknown(code) => format!("unknown session error {}", code),
        }
    }
}

impl From<u8> for SessionError {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::NotRunningApp,
            2 => Self::NoRightsToApp,
            3 => Self::DestinationNotLoggedIn,
            4 => Self::Timeout,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.reason(), self.code())
    }
}
