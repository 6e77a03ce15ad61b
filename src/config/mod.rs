//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags ──┐
//!             ├─→ ReloadConfig (schema.rs, raw values)
//! TOML file ──┘   (loader.rs)
//!     → validation.rs (host normalisation, port range, delay clamp)
//!     → ServerOptions (options.rs, validated, immutable)
//!     → handed to ReloadServer at construction
//! ```
//!
//! # Design Decisions
//! - Options are immutable once built; there is no hot reload of settings
//! - Every raw field has a default so a config file may be partial
//! - Validation fails fast: the server never starts on bad input

pub mod error;
pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use error::ConfigError;
pub use options::{ForwardTarget, ServerOptions};
pub use schema::ReloadConfig;
