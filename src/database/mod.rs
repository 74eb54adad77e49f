//! Database connectivity subsystem.
//!
//! # Data Flow
//! ```text
//! Request gate / health route / startup
//!     → coordinator.rs (single-flight connect, state machine)
//!         → driver.rs trait (mongo.rs in production, stubs in tests)
//!         → health::ReadinessVerifier (ping)
//!     → error.rs + classifier.rs (ConnectError with category)
//! ```
//!
//! # Design Decisions
//! - One coordinator per process, injected rather than global
//! - Only the coordinator calls `connect`/`close` on the driver
//! - Driver state is a hint; only a verified attempt makes the coordinator
//!   report Connected

pub mod classifier;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod mongo;
pub mod state;

pub use coordinator::{ConnectionCoordinator, ConnectionStatus};
pub use driver::{ConnectOptions, Driver, DriverEvent};
pub use error::{ConnectError, DriverError, ErrorCategory};
pub use mongo::MongoDriver;
pub use state::ConnectionState;
