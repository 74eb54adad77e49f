//! Connection state machine.
//!
//! # States
//! - Disconnected: no usable connection, a new attempt may start
//! - Connecting: an attempt is establishing the connection
//! - Connected: connection established and verified
//! - Disconnecting: the driver is tearing its connection down
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: attempt started
//! Connecting → Connected: connect + notification + probe all succeeded
//! Connecting → Disconnected: any step of the attempt failed
//! Connected → Disconnected: driver dropped, or shutdown
//! ```
//!
//! The numeric codes follow the classic driver ready-state encoding and are
//! what `/health/db` reports.

use serde::Serialize;
use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    /// True for the two states a driver passes through on its own.
    pub fn is_transitional(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Disconnecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
