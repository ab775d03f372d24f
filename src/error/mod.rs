//! Error handling for esdump.
//!
//! Errors are split by the stage that raised them so callers can apply the
//! right policy:
//! - [`FetchError`]: the remote index failed or rejected the request (fatal)
//! - [`SinkError`]: opening, writing or finalizing the output failed
//! - [`ConfigError`]: the configuration file or flags are invalid
//!
//! # Example
//!
//! ```rust,no_run
//! use esdump::error::{DumpError, Result};
//!
//! fn handle(result: Result<()>) {
//!     if let Err(DumpError::Fetch(e)) = result {
//!         eprintln!("remote index failed: {e}");
//!     }
//! }
//! ```

pub mod elastic;
pub mod kinds;

// Re-export commonly used types
pub use elastic::ErrorInfo;
pub use kinds::{ConfigError, DumpError, FetchError, Result, SinkError};
