//! Export module for streaming index exports
//!
//! This module provides the export pipeline:
//! - Cursor-based paging through a remote index, with an optional record cap
//! - A bounded relay between the fetch and write stages
//! - Serialization to JSON Lines through optional gzip
//! - Periodic progress accounting on both stages
//!
//! # Architecture
//!
//! 1. **CursorFetcher**: pages through a [`ScrollCursor`] on its own task
//! 2. **Relay**: fixed-capacity FIFO that makes the fetcher wait for the writer
//! 3. **RecordSink**: owns the output and its compression layer
//! 4. **FetchProgress / WriteProgress**: per-stage counters and summaries
//!
//! These components are orchestrated by the **ExportCoordinator**.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use esdump::config::Config;
//! use esdump::connection::ElasticIndex;
//! use esdump::export::{ExportCoordinator, ExportOptions, Filter, OutputTarget};
//!
//! # async fn run() -> esdump::Result<()> {
//! let config = Config::default();
//! let index = ElasticIndex::new(&config.connection, "logs")?;
//! let options = ExportOptions::new(
//!     OutputTarget::parse("logs.json"),
//!     Filter::default(),
//!     true,
//!     &config.export,
//! );
//! let report = ExportCoordinator::new(Arc::new(index), options).execute().await?;
//! println!("{} documents", report.summary.items);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod fetcher;
pub mod options;
pub mod progress;
pub mod record;
pub mod relay;
pub mod streaming;
pub mod writers;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{ExportCoordinator, ExportReport};
pub use fetcher::{CursorFetcher, FetchReport, StopReason};
pub use options::{ExportOptions, OutputTarget};
pub use progress::{ExportSummary, FetchStats, WriteStats};
pub use record::{Filter, Hit, Page};
pub use streaming::{ScrollCursor, SearchIndex};
pub use writers::{JsonLinesSink, RecordSink};
