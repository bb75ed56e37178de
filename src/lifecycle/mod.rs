//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Trigger → broadcast to subscribers → tasks drain and exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Single broadcast coordinator; every long-running task holds a receiver
//! - The HTTP server and the maintenance sweeper both drain on the same signal

pub mod shutdown;
pub mod signals;
