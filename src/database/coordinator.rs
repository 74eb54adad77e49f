//! Connection coordinator.
//!
//! # Responsibilities
//! - Guarantee on demand that the shared driver is connected and verified
//! - Run at most one connection attempt at a time; late callers join it
//! - Bound every step that touches the network
//! - Reset cleanly after any failure so the next request can retry
//!
//! # Flow of `ensure_connection`
//! ```text
//! cached Connected and driver agrees  → Ok (no I/O)
//! attempt in flight                   → join it
//! driver Connecting/Disconnecting     → poll until it settles (bounded), re-enter
//! otherwise                           → start attempt:
//!     target configured?              → else ConfigurationMissing
//!     driver in a stale state?        → close it, errors ignored
//!     connect() + Connected event     → both required, each with its own timer
//!     driver state == Connected?      → else InconsistentState
//!     liveness probe                  → else close and fail
//! ```
//!
//! # Concurrency
//! State and the in-flight slot live behind a mutex that is only held for
//! synchronous check-then-set blocks, never across an `.await`. The attempt
//! itself runs as a spawned task so a caller that gives up waiting never
//! cancels it for everyone else.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::driver::{ConnectOptions, Driver, DriverEvent};
use crate::database::error::{ConnectError, DriverError, ErrorCategory};
use crate::database::state::ConnectionState;
use crate::health::ReadinessVerifier;
use crate::observability::metrics;
use crate::resilience::polling::poll_until;
use crate::resilience::timeouts::bounded;

type AttemptOutcome = Result<(), ConnectError>;

/// The single pending connection operation, shared by every joined caller.
#[derive(Clone)]
struct InFlightAttempt {
    id: Uuid,
    outcome: Shared<BoxFuture<'static, AttemptOutcome>>,
}

struct Inner {
    state: ConnectionState,
    in_flight: Option<InFlightAttempt>,
}

impl Inner {
    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        metrics::record_connection_state(state);
    }
}

enum Step {
    Ready,
    Join(InFlightAttempt),
    AwaitTransition(ConnectionState),
}

/// Point-in-time view of the coordinator, safe to expose.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub ready_state: u8,
    pub driver_state: ConnectionState,
    pub attempt_in_flight: bool,
    pub target_configured: bool,
    /// Connection target with credentials masked.
    pub target: Option<String>,
}

pub struct ConnectionCoordinator {
    driver: Arc<dyn Driver>,
    config: DatabaseConfig,
    options: ConnectOptions,
    verifier: ReadinessVerifier,
    inner: Mutex<Inner>,
}

impl ConnectionCoordinator {
    pub fn new(driver: Arc<dyn Driver>, config: DatabaseConfig) -> Self {
        let options = ConnectOptions::from(&config);
        let verifier = ReadinessVerifier::new(Duration::from_millis(config.probe_timeout_ms));
        Self {
            driver,
            config,
            options,
            verifier,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                in_flight: None,
            }),
        }
    }

    /// The coordinator's own (verified) view of the connection.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn status(&self) -> ConnectionStatus {
        let inner = self.inner.lock();
        ConnectionStatus {
            state: inner.state,
            ready_state: inner.state as u8,
            driver_state: self.driver.state(),
            attempt_in_flight: inner.in_flight.is_some(),
            target_configured: self.config.target().is_some(),
            target: self.config.redacted_target(),
        }
    }

    /// Make sure the driver is connected and answering.
    ///
    /// Cheap when already connected: no lock contention beyond a state read and
    /// no network call.
    pub async fn ensure_connection(self: &Arc<Self>) -> Result<(), ConnectError> {
        let mut waited = false;
        loop {
            match self.next_step(waited) {
                Step::Ready => return Ok(()),
                Step::Join(attempt) => {
                    tracing::trace!(attempt = %attempt.id, "Awaiting connection attempt");
                    return attempt.outcome.await;
                }
                Step::AwaitTransition(observed) => {
                    self.await_transition(observed).await?;
                    waited = true;
                }
            }
        }
    }

    /// Re-run the liveness probe against an established connection. A failed
    /// probe drops the cached `Connected` state.
    pub async fn verify(&self) -> Result<(), ConnectError> {
        let result = self.verifier.verify(self.driver.as_ref()).await;
        if result.is_err() {
            let mut inner = self.inner.lock();
            if inner.in_flight.is_none() && inner.state == ConnectionState::Connected {
                tracing::warn!("Dropping cached connection after failed probe");
                inner.set_state(ConnectionState::Disconnected);
            }
        }
        result
    }

    /// Close the driver. Waits for a pending attempt to settle first so the
    /// close is not undone by it.
    pub async fn shutdown(&self) {
        let pending = self.inner.lock().in_flight.clone();
        if let Some(attempt) = pending {
            tracing::info!(attempt = %attempt.id, "Waiting for connection attempt before closing");
            let _ = attempt.outcome.await;
        }

        self.inner.lock().set_state(ConnectionState::Disconnecting);
        let limit = Duration::from_millis(self.config.close_timeout_ms);
        match bounded("close", limit, self.driver.close()).await {
            Ok(()) => tracing::info!("Database connection closed"),
            Err(e) => tracing::warn!(error = %e, "Database close failed during shutdown"),
        }
        self.inner.lock().set_state(ConnectionState::Disconnected);
    }

    /// Follow driver notifications so a connection lost between requests is
    /// not served from cache.
    pub fn watch_driver_events(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let mut events = self.driver.subscribe();
        let coordinator = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(DriverEvent::Connected) => {}
                        Ok(DriverEvent::Disconnected) => {
                            if !Self::on_connection_lost(&coordinator, "disconnected") {
                                break;
                            }
                        }
                        Ok(DriverEvent::Error(e)) => {
                            tracing::error!(error = %e, "Database driver reported an error");
                            if !Self::on_connection_lost(&coordinator, "error") {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Driver event watcher lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Driver event watcher stopped");
        })
    }

    /// Returns false once the coordinator itself is gone.
    fn on_connection_lost(coordinator: &Weak<Self>, reason: &str) -> bool {
        let Some(coordinator) = coordinator.upgrade() else {
            return false;
        };
        let mut inner = coordinator.inner.lock();
        if inner.in_flight.is_none() && inner.state == ConnectionState::Connected {
            tracing::warn!(reason, "Database connection lost");
            inner.set_state(ConnectionState::Disconnected);
        }
        true
    }

    fn next_step(self: &Arc<Self>, waited: bool) -> Step {
        let mut inner = self.inner.lock();
        let driver_state = self.driver.state();

        if inner.state == ConnectionState::Connected {
            if driver_state == ConnectionState::Connected {
                return Step::Ready;
            }
            tracing::warn!(driver_state = %driver_state, "Cached connection no longer reported by driver");
            inner.set_state(ConnectionState::Disconnected);
        }

        if let Some(attempt) = &inner.in_flight {
            return Step::Join(attempt.clone());
        }

        if driver_state.is_transitional() && !waited {
            return Step::AwaitTransition(driver_state);
        }

        Step::Join(self.start_attempt(&mut inner))
    }

    fn start_attempt(self: &Arc<Self>, inner: &mut Inner) -> InFlightAttempt {
        let id = Uuid::new_v4();
        inner.set_state(ConnectionState::Connecting);

        let task = tokio::spawn(Arc::clone(self).run_attempt(id));
        let coordinator = Arc::downgrade(self);
        let outcome = task
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    let err = ConnectError::new(
                        ErrorCategory::Unknown,
                        format!("connection attempt aborted: {e}"),
                    );
                    if let Some(coordinator) = coordinator.upgrade() {
                        coordinator.finish_attempt(id, &Err(err.clone()));
                    }
                    Err(err)
                })
            })
            .boxed()
            .shared();

        let attempt = InFlightAttempt { id, outcome };
        inner.in_flight = Some(attempt.clone());
        attempt
    }

    async fn run_attempt(self: Arc<Self>, id: Uuid) -> AttemptOutcome {
        let start = Instant::now();
        tracing::info!(
            attempt = %id,
            target_configured = self.config.target().is_some(),
            "Starting database connection attempt"
        );

        let result = self.connect_attempt(id).await;
        metrics::record_connect_attempt(
            result.as_ref().map(|_| ()).map_err(ConnectError::category),
            start,
        );

        match &result {
            Ok(()) => tracing::info!(
                attempt = %id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Database connected"
            ),
            Err(e) => tracing::error!(
                attempt = %id,
                category = %e.category(),
                error = %e.detail(),
                target_configured = self.config.target().is_some(),
                host = ?self.config.target_host(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Database connection attempt failed"
            ),
        }

        self.finish_attempt(id, &result);
        result
    }

    fn finish_attempt(&self, id: Uuid, result: &AttemptOutcome) {
        let mut inner = self.inner.lock();
        if inner.in_flight.as_ref().is_some_and(|a| a.id == id) {
            inner.in_flight = None;
            inner.set_state(if result.is_ok() {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            });
        }
    }

    async fn connect_attempt(&self, id: Uuid) -> AttemptOutcome {
        let Some(target) = self.config.target() else {
            return Err(ConnectError::configuration_missing("MONGO_URL"));
        };

        match self.driver.state() {
            ConnectionState::Connected => {
                tracing::info!(attempt = %id, "Driver already connected, verifying before use");
            }
            ConnectionState::Disconnected => self.connect_or_reset(id, target).await?,
            stale => {
                self.close_quietly(id, stale).await;
                self.connect_or_reset(id, target).await?;
            }
        }

        let observed = self.driver.state();
        if observed != ConnectionState::Connected {
            return Err(ConnectError::inconsistent_state(observed));
        }

        if let Err(e) = self.verifier.verify(self.driver.as_ref()).await {
            self.close_quietly(id, observed).await;
            return Err(e);
        }

        Ok(())
    }

    /// A connect dropped on timeout can leave the driver `Connecting`. Close it
    /// so the next request starts a fresh attempt.
    async fn connect_or_reset(&self, id: Uuid, target: &str) -> AttemptOutcome {
        let result = self.connect_and_confirm(id, target).await;
        if result.is_err() {
            let observed = self.driver.state();
            if observed != ConnectionState::Disconnected {
                self.close_quietly(id, observed).await;
            }
        }
        result
    }

    /// Issue `connect` and wait for both its result and the driver's
    /// `Connected` notification.
    async fn connect_and_confirm(&self, id: Uuid, target: &str) -> AttemptOutcome {
        // Subscribe before connecting so the notification cannot be missed.
        let mut events = self.driver.subscribe();
        let limit = self.options.connect_timeout;
        let driver = self.driver.as_ref();

        tracing::debug!(
            attempt = %id,
            connect_timeout_ms = limit.as_millis() as u64,
            max_pool_size = self.options.max_pool_size,
            "Connecting"
        );

        let call = bounded("connect", limit, driver.connect(target, &self.options));
        let notification = bounded("connected notification", limit, async move {
            loop {
                match events.recv().await {
                    Ok(DriverEvent::Connected) => return Ok(()),
                    Ok(DriverEvent::Error(e)) => return Err(e),
                    Ok(DriverEvent::Disconnected) => continue,
                    Err(RecvError::Lagged(_)) => {
                        if driver.state() == ConnectionState::Connected {
                            return Ok(());
                        }
                    }
                    Err(RecvError::Closed) => {
                        return Err(DriverError::new("driver event channel closed"));
                    }
                }
            }
        });

        tokio::try_join!(call, notification)?;
        tracing::debug!(attempt = %id, "Connect resolved and connected notification received");
        Ok(())
    }

    /// Best-effort close of a connection that is not in a clean state.
    async fn close_quietly(&self, id: Uuid, observed: ConnectionState) {
        tracing::info!(attempt = %id, driver_state = %observed, "Closing stale connection");
        let limit = Duration::from_millis(self.config.close_timeout_ms);
        if let Err(e) = bounded("close", limit, self.driver.close()).await {
            tracing::warn!(attempt = %id, error = %e, "Ignoring error while closing stale connection");
        }
    }

    async fn await_transition(&self, observed: ConnectionState) -> Result<(), ConnectError> {
        let max_wait = Duration::from_millis(match observed {
            ConnectionState::Connecting => self.config.connecting_wait_ms,
            _ => self.config.disconnecting_wait_ms,
        });
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        tracing::info!(
            driver_state = %observed,
            max_wait_ms = max_wait.as_millis() as u64,
            "Driver is transitioning, waiting for it to settle"
        );

        let settled = poll_until(interval, max_wait, || {
            let state = self.driver.state();
            (!state.is_transitional()).then_some(state)
        })
        .await;

        match settled {
            Some(state) => {
                tracing::debug!(driver_state = %state, "Driver transition settled");
                Ok(())
            }
            None => Err(ConnectError::timeout(
                &format!("waiting for driver to leave {observed}"),
                max_wait,
            )),
        }
    }
}
