//! Observability.
//!
//! Structured logging through `tracing`; HTTP requests are traced by the
//! `TraceLayer` installed on the router.

pub mod logging;
