//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! accept() fails
//!     → backoff.rs (decide whether and how long to pause)
//!     → accept loop resumes
//! ```
//!
//! # Design Decisions
//! - Accept failures are never terminal
//! - Default strategy is "no backoff"; pacing is opt-in
//! - Exponential pacing is jittered so restarts do not synchronize

pub mod backoff;

pub use backoff::AcceptBackoff;
