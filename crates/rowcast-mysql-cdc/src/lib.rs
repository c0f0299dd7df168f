//! MySQL change-data-capture pipeline for rowcast
//!
//! Attaches to MySQL servers as a replica through a [`client::ReplicationClient`],
//! filters and projects the row-change stream per source configuration, and
//! delivers [`rowcast_core::ChangeEvent`]s over bounded per-server channels.
//! Replication progress and table-column evolution are checkpointed to a JSON
//! meta file so restarts resume where they left off.

pub mod catalog;
pub mod client;
pub mod column;
pub mod config;
pub mod consumer;
pub mod extractor;
pub mod handler;
pub mod meta;

#[cfg(test)]
mod testutil;

pub use catalog::*;
pub use client::*;
pub use column::*;
pub use config::*;
pub use consumer::*;
pub use extractor::*;
pub use handler::*;
pub use meta::*;
