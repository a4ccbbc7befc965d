//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request.rs (request ID)
//!     → middleware/deny_list.rs (403 or continue)
//!     → server.rs forward handler (upstream, response streamed back)
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{DenyListPolicy, DenyListState};
pub use request::X_REQUEST_ID;
pub use server::{GateServer, ServerError};
