//! HTTP deny-list gate.
//!
//! Resolves the client address of each request from the proxy-chain header
//! and the peer address, and answers 403 when any candidate falls in the
//! configured deny set of addresses and CIDR ranges.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
pub use security::{AddressSet, Decision, Gate};
