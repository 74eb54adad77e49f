//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Connect attempt finished (connect resolved + connected notification)
//!     → verifier.rs (ping with its own deadline)
//!     → Ok: coordinator caches Connected
//!     → Err: coordinator resets to Disconnected
//! ```
//!
//! # Design Decisions
//! - A socket that opened is not proof of health; only a round trip is
//! - The probe is never skipped, including on the health endpoint

pub mod verifier;

pub use verifier::ReadinessVerifier;
