//! Core types and event plumbing for rowcast

pub mod error;
pub mod event;
pub mod stream;

pub use error::*;
pub use event::*;
pub use stream::*;
