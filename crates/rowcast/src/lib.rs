//! `rowcast` — convenience façade over the rowcast crates.
//!
//! Re-exports the core event types, the MySQL CDC pipeline, and the shared
//! runtime utilities so hosts can depend on a single crate:
//!
//! ```ignore
//! use rowcast::{CdcSettings, Coordinator};
//!
//! let settings: CdcSettings = rowcast::config::load("rowcast.toml")?;
//! let coordinator = Coordinator::new();
//! coordinator.init(&settings.meta_dir, settings.sources, &factory).await?;
//! while let Some(event) = coordinator.events(42).await.unwrap().recv().await {
//!     // deliver the change event downstream
//! }
//! ```

#[doc(inline)]
pub use rowcast_core::*;

#[doc(inline)]
pub use rowcast_mysql_cdc::*;

pub use rowcast_shared::config::{self, LoggingConfig};
pub use rowcast_shared::observability::{init_logging, PipelineMetrics};
pub use rowcast_shared::runstate::RunState;

/// Nested module paths for hosts that prefer explicit crate names.
pub use rowcast_core as core;
pub use rowcast_mysql_cdc as mysql_cdc;
pub use rowcast_shared as shared;
