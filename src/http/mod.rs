//! HTTP side of the reload proxy.
//!
//! # Data Flow
//! ```text
//! Browser request
//!     → server.rs (dispatch: upgrade or proxy)
//!         upgrade → websocket.rs (push channel, registered for broadcasts)
//!         proxy   → request.rs (URL rewrite, forwarded headers)
//!                 → upstream client
//!                 → response.rs (hop-by-hop strip, streamed body)
//!     → inject.rs (append the reload client to HTML)
//!     → Browser
//! ```

pub mod inject;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use inject::{inject_reload_script, InjectError, ResponseInjector};
pub use server::{ReloadServer, ServerError, ServerState};
