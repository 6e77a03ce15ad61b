//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     ReloadConfig → ServerOptions → bind → ReloadServer → ChangeBridge → run
//!
//! Shutdown (shutdown.rs):
//!     Signal or explicit trigger → latch → stop accepting → drain HTTP → close push channels
//!
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener is bound before anything else starts, so a busy port
//!   exits before watches are set up
//! - Draining is bounded by the configured grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
