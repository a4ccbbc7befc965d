//! Security subsystem: the deny-list gate.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (proxy-chain header + peer → ordered candidates)
//!     → gate.rs (first candidate found in the deny set wins)
//!     → address_set.rs (literal / CIDR membership)
//!     → Allow: forward | Deny: 403
//! ```
//!
//! # Design Decisions
//! - Fail closed: an invalid or empty deny list never starts serving
//! - No trust in client input: header entries only add candidates
//! - No I/O in the core; events go through [`DecisionObserver`]

pub mod address_set;
pub mod client_ip;
pub mod gate;

pub use address_set::{AddressError, AddressSet, AddressSetBuilder};
pub use client_ip::{resolve, X_FORWARDED_FOR};
pub use gate::{Decision, DecisionObserver, Gate};
