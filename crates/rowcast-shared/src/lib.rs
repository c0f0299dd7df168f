//! Shared utilities and runtime plumbing for rowcast

pub mod config;
pub mod observability;
pub mod runstate;

pub use config::*;
pub use observability::*;
pub use runstate::*;
