//! Request middleware.

pub mod deny_list;

pub use deny_list::{deny_list_middleware, DenyListPolicy, DenyListState};
