//! Output sinks for export runs
//!
//! A sink accepts serialized records one line at a time and owns the output
//! target for the whole run. Finalization flushes every layer exactly once.

use async_trait::async_trait;

use crate::error::SinkError;

pub mod counting;
pub mod jsonl;

pub use counting::CountingWriter;
pub use jsonl::JsonLinesSink;

/// Buffer size in front of the compression layer
pub const OUTPUT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Trait for writing serialized records to an output
#[async_trait]
pub trait RecordSink: Send {
    /// Write one serialized record followed by a line terminator
    ///
    /// # Arguments
    /// * `line` - Compact record bytes, without terminator
    ///
    /// # Returns
    /// * `Result<u64, SinkError>` - Bytes accepted, terminator included
    async fn write_line(&mut self, line: &[u8]) -> Result<u64, SinkError>;

    /// Flush and close every layer of the output
    ///
    /// Only the first call does any work; later calls return the same size.
    ///
    /// # Returns
    /// * `Result<u64, SinkError>` - Bytes that reached the underlying target
    async fn finalize(&mut self) -> Result<u64, SinkError>;

    /// Whether records pass through a compression layer
    fn is_compressed(&self) -> bool;
}
