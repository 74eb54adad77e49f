//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator step touching the network:
//!     → timeouts.rs (every connect/close/probe/notification wait has a deadline)
//! Driver transitioning on its own:
//!     → polling.rs (fixed interval, bounded total wait)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries inside an attempt: a failed attempt resets, and the next
//!   request starts a fresh one

pub mod polling;
pub mod timeouts;
