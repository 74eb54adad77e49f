//! MongoDB driver adapter.
//!
//! The `mongodb` client connects lazily and has no ready-state of its own, so
//! this adapter tracks one: `connect` builds the client and forces server
//! selection with a ping, then publishes [`DriverEvent::Connected`].
//!
//! After that, topology monitoring keeps the state honest: a failed server
//! heartbeat publishes [`DriverEvent::Error`] so the cached connection gets
//! re-verified, and a closed topology drops the state to `Disconnected`.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::event::sdam::SdamEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::Client;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::database::driver::{ConnectOptions, Driver, DriverEvent};
use crate::database::error::DriverError;
use crate::database::state::ConnectionState;

const EVENT_CAPACITY: usize = 16;

/// Ready state and notifications, shared with the client's monitoring callback.
struct Lifecycle {
    state: AtomicU8,
    events: broadcast::Sender<DriverEvent>,
    /// Bumped on every connect; callbacks from older clients are ignored.
    generation: AtomicU64,
}

/// What topology monitoring reported for one client.
#[derive(Debug)]
enum Monitored {
    HeartbeatFailed(DriverError),
    TopologyClosed,
}

impl Lifecycle {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            events,
            generation: AtomicU64::new(0),
        }
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn publish(&self, event: DriverEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Only an established connection is affected; `connect` and `close`
    /// report their own outcome.
    fn on_monitored(&self, generation: u64, signal: Monitored) {
        if self.generation.load(Ordering::SeqCst) != generation
            || self.state() != ConnectionState::Connected
        {
            return;
        }

        match signal {
            Monitored::HeartbeatFailed(err) => {
                tracing::warn!(error = %err, "Database heartbeat failed");
                self.publish(DriverEvent::Error(err));
            }
            Monitored::TopologyClosed => {
                tracing::warn!("Database topology closed");
                self.set_state(ConnectionState::Disconnected);
                self.publish(DriverEvent::Disconnected);
            }
        }
    }
}

/// Puts the state back to `Disconnected` unless `connect` runs to completion,
/// including when its future is dropped on a timeout.
struct ConnectGuard<'a> {
    lifecycle: &'a Lifecycle,
    completed: bool,
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.lifecycle.set_state(ConnectionState::Disconnected);
        }
    }
}

pub struct MongoDriver {
    client: Mutex<Option<Client>>,
    lifecycle: Arc<Lifecycle>,
    /// Per-operation bound, taken from the socket timeout of the last connect.
    operation_timeout: Mutex<Option<Duration>>,
}

impl MongoDriver {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
            lifecycle: Arc::new(Lifecycle::new()),
            operation_timeout: Mutex::new(None),
        }
    }

    fn client(&self) -> Result<Client, DriverError> {
        self.client
            .lock()
            .clone()
            .ok_or_else(|| DriverError::new("client is not connected"))
    }

    async fn admin_ping(client: &Client, limit: Option<Duration>) -> Result<(), DriverError> {
        let admin = client.database("admin");
        let ping = admin.run_command(doc! { "ping": 1 });
        match limit {
            Some(limit) => match tokio::time::timeout(limit, ping).await {
                Ok(result) => result.map(|_| ()).map_err(driver_error),
                Err(_) => Err(DriverError::with_code("ping timed out", "ETIMEDOUT")),
            },
            None => ping.await.map(|_| ()).map_err(driver_error),
        }
    }

    fn monitor(lifecycle: Arc<Lifecycle>, generation: u64) -> EventHandler<SdamEvent> {
        EventHandler::callback(move |event: SdamEvent| {
            let signal = match event {
                SdamEvent::ServerHeartbeatFailed(failed) => {
                    Monitored::HeartbeatFailed(driver_error(failed.failure.clone()))
                }
                SdamEvent::TopologyClosed(_) => Monitored::TopologyClosed,
                _ => return,
            };
            lifecycle.on_monitored(generation, signal);
        })
    }

    fn fail(&self, err: DriverError) -> DriverError {
        self.lifecycle.set_state(ConnectionState::Disconnected);
        self.lifecycle.publish(DriverEvent::Error(err.clone()));
        err
    }
}

impl Default for MongoDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MongoDriver {
    async fn connect(&self, target: &str, options: &ConnectOptions) -> Result<(), DriverError> {
        let generation = self.lifecycle.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.lifecycle.set_state(ConnectionState::Connecting);
        let mut guard = ConnectGuard {
            lifecycle: &self.lifecycle,
            completed: false,
        };

        let mut client_options = match ClientOptions::parse(target).await {
            Ok(parsed) => parsed,
            Err(e) => return Err(self.fail(driver_error(e))),
        };
        client_options.server_selection_timeout = Some(options.server_selection_timeout);
        client_options.connect_timeout = Some(options.connect_timeout);
        client_options.max_pool_size = Some(options.max_pool_size);
        client_options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        client_options.sdam_event_handler =
            Some(Self::monitor(Arc::clone(&self.lifecycle), generation));

        let client = match Client::with_options(client_options) {
            Ok(client) => client,
            Err(e) => return Err(self.fail(driver_error(e))),
        };

        // The client is lazy; a round trip forces server selection.
        if let Err(e) = Self::admin_ping(&client, None).await {
            return Err(self.fail(e));
        }

        *self.operation_timeout.lock() = Some(options.socket_timeout);
        *self.client.lock() = Some(client);
        guard.completed = true;
        self.lifecycle.set_state(ConnectionState::Connected);
        self.lifecycle.publish(DriverEvent::Connected);
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let client = self.client.lock().take();
        let Some(client) = client else {
            self.lifecycle.set_state(ConnectionState::Disconnected);
            return Ok(());
        };

        self.lifecycle.set_state(ConnectionState::Disconnecting);
        client.shutdown().await;
        self.lifecycle.set_state(ConnectionState::Disconnected);
        self.lifecycle.publish(DriverEvent::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.lifecycle.events.subscribe()
    }

    async fn ping(&self) -> Result<(), DriverError> {
        let client = self.client()?;
        let limit = *self.operation_timeout.lock();
        Self::admin_ping(&client, limit).await
    }
}

/// The parts of a driver error the classifier keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Authentication,
    DnsResolve,
    Command(i32),
    Other,
}

impl From<&ErrorKind> for FailureKind {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::Authentication { .. } => FailureKind::Authentication,
            ErrorKind::DnsResolve { .. } => FailureKind::DnsResolve,
            ErrorKind::Command(command) => FailureKind::Command(command.code),
            _ => FailureKind::Other,
        }
    }
}

/// Flatten a driver error into message + code so it can be classified.
fn driver_error(err: MongoError) -> DriverError {
    flatten(FailureKind::from(err.kind.as_ref()), err.to_string())
}

fn flatten(kind: FailureKind, message: String) -> DriverError {
    let code = match kind {
        FailureKind::Authentication => Some("AuthenticationFailed".to_string()),
        FailureKind::DnsResolve => Some("DnsResolve".to_string()),
        FailureKind::Command(code) => Some(code.to_string()),
        FailureKind::Other => None,
    };
    DriverError { message, code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::classifier::classify;
    use crate::database::error::ErrorCategory;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_failure_kinds_reach_the_right_category() {
        let cases = [
            (FailureKind::Authentication, "SCRAM conversation failed", ErrorCategory::AuthenticationFailed),
            (FailureKind::Command(18), "Authentication failed.", ErrorCategory::AuthenticationFailed),
            (FailureKind::Command(8000), "bad auth", ErrorCategory::AuthenticationFailed),
            (FailureKind::DnsResolve, "No DNS results for domain cluster0.example.net", ErrorCategory::NameResolutionFailed),
            (
                FailureKind::Other,
                "Server selection timeout: No available servers",
                ErrorCategory::Timeout,
            ),
            (FailureKind::Command(11600), "interrupted at shutdown", ErrorCategory::Unknown),
        ];

        for (kind, message, expected) in cases {
            let err = flatten(kind, message.to_string());
            assert_eq!(classify(&err), expected, "{kind:?}: {message}");
        }
    }

    #[test]
    fn test_command_code_is_kept() {
        let err = flatten(FailureKind::Command(18), "Authentication failed.".into());
        assert_eq!(err.code.as_deref(), Some("18"));
        assert_eq!(flatten(FailureKind::Other, "boom".into()).code, None);
    }

    #[tokio::test]
    async fn test_invalid_target_maps_to_unknown() {
        let err = ClientOptions::parse("postgres://localhost:5432").await.unwrap_err();
        let flattened = driver_error(err);

        assert_eq!(flattened.code, None);
        assert_eq!(classify(&flattened), ErrorCategory::Unknown);
    }

    fn connected(lifecycle: &Lifecycle, generation: u64) {
        lifecycle.generation.store(generation, Ordering::SeqCst);
        lifecycle.set_state(ConnectionState::Connected);
    }

    #[test]
    fn test_heartbeat_failure_publishes_error() {
        let lifecycle = Lifecycle::new();
        let mut events = lifecycle.events.subscribe();
        connected(&lifecycle, 3);

        lifecycle.on_monitored(3, Monitored::HeartbeatFailed(DriverError::new("connection refused")));

        assert!(matches!(events.try_recv(), Ok(DriverEvent::Error(_))));
        // Re-verification decides; the state itself is left alone.
        assert_eq!(lifecycle.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_topology_closed_drops_state() {
        let lifecycle = Lifecycle::new();
        let mut events = lifecycle.events.subscribe();
        connected(&lifecycle, 1);

        lifecycle.on_monitored(1, Monitored::TopologyClosed);

        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
        assert_eq!(events.try_recv(), Ok(DriverEvent::Disconnected));
    }

    #[test]
    fn test_stale_or_unsettled_signals_are_ignored() {
        let lifecycle = Lifecycle::new();
        let mut events = lifecycle.events.subscribe();

        // From a client that has since been replaced.
        connected(&lifecycle, 2);
        lifecycle.on_monitored(1, Monitored::TopologyClosed);
        assert_eq!(lifecycle.state(), ConnectionState::Connected);

        // While a connect is still running.
        lifecycle.set_state(ConnectionState::Connecting);
        lifecycle.on_monitored(2, Monitored::HeartbeatFailed(DriverError::new("refused")));
        lifecycle.on_monitored(2, Monitored::TopologyClosed);
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);

        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_dropped_connect_resets_state() {
        let driver = MongoDriver::new();
        let options = ConnectOptions {
            server_selection_timeout: Duration::from_secs(30),
            socket_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            max_pool_size: 1,
        };

        // Nothing listens on port 1, so server selection never finishes.
        let result = tokio::time::timeout(
            Duration::from_millis(200),
            driver.connect("mongodb://127.0.0.1:1/social", &options),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(driver.state(), ConnectionState::Disconnected);
    }
}
