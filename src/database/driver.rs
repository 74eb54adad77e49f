//! Driver abstraction.
//!
//! The coordinator owns the only handle that calls `connect`/`close`; everything
//! else reads state or pings through it.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::DatabaseConfig;
use crate::database::error::DriverError;
use crate::database::state::ConnectionState;

/// Options passed to [`Driver::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub server_selection_timeout: Duration,
    pub socket_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_pool_size: u32,
}

impl From<&DatabaseConfig> for ConnectOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            server_selection_timeout: Duration::from_millis(config.server_selection_timeout_ms),
            socket_timeout: Duration::from_millis(config.socket_timeout_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_pool_size: config.max_pool_size,
        }
    }
}

/// One-shot notifications a driver publishes as its connection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Connected,
    Disconnected,
    Error(DriverError),
}

/// A stateful database driver.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Establish the connection. Resolving does not by itself mean the driver is
    /// ready; readiness is announced with [`DriverEvent::Connected`].
    async fn connect(&self, target: &str, options: &ConnectOptions) -> Result<(), DriverError>;

    /// Tear down the current connection, if any.
    async fn close(&self) -> Result<(), DriverError>;

    /// The driver's own view of its connection.
    fn state(&self) -> ConnectionState;

    /// Subscribe to connection notifications published after this call.
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;

    /// Minimal liveness round trip against the data store.
    async fn ping(&self) -> Result<(), DriverError>;
}
