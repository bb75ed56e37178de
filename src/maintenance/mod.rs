//! Scheduled maintenance tasks.
//!
//! # Data Flow
//! ```text
//! Sweep (sweep.rs):
//!     Interval tick → clear expired boost windows → log + count
//!     Shutdown signal → drain and exit
//! ```
//!
//! The sweep can also be invoked on demand through the admin API, so the
//! background loop stays optional and defaults to off.

pub mod sweep;

pub use sweep::{run_sweep, run_sweeper};
