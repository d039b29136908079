use std::fmt;

/// Client connection lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientConnectionState {
    #[default]
    Offline,
    Connecting,
    Connected,
    /// Reserved, never entered
    Disconnecting,
}

/// Server lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerStatus {
    #[default]
    Offline,
    Listening,
}

impl fmt::Display for ClientConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Offline => "offline",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(label)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::Listening => f.write_str("listening"),
        }
    }
}
