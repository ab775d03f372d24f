//! esdump library
//!
//! Streaming export of an Elasticsearch index to JSON Lines. The pipeline
//! can be driven from code as well as from the `esdump` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: Elasticsearch scroll client
//! - `error`: Error types and handling
//! - `export`: Fetcher, relay, writer and progress accounting
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use esdump::{Config, ElasticIndex, ExportCoordinator, ExportOptions};
//! use esdump::export::{Filter, OutputTarget};
//!
//! #[tokio::main]
//! async fn main() -> esdump::Result<()> {
//!     let config = Config::default();
//!     let index = ElasticIndex::new(&config.connection, "logs")?;
//!     let options = ExportOptions::new(OutputTarget::Stdout, Filter::default(), false, &config.export)
//!         .with_max_records(100);
//!
//!     let report = ExportCoordinator::new(Arc::new(index), options).execute().await?;
//!     eprintln!("exported {} documents", report.summary.items);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use config::Config;
pub use connection::ElasticIndex;
pub use error::{DumpError, Result};
pub use export::{ExportCoordinator, ExportOptions, ExportReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
