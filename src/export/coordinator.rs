//! Export coordinator for orchestrating export runs
//!
//! This module brings together the cursor fetcher, the relay, and the sink
//! writer to perform one bounded-memory streaming export.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{DumpError, Result, SinkError};

use super::fetcher::{CursorFetcher, FetchReport, StopReason};
use super::options::ExportOptions;
use super::progress::{ExportSummary, WriteProgress, WriteStats};
use super::record::Hit;
use super::relay::{RelayConsumer, relay};
use super::streaming::SearchIndex;
use super::writers::{JsonLinesSink, RecordSink};

/// Result of an export run that was not aborted by the index
#[derive(Debug)]
pub struct ExportReport {
    /// Final numbers, as logged
    pub summary: ExportSummary,
    /// Fetch-side counters and why fetching stopped
    pub fetch: FetchReport,
    /// Write-side counters
    pub write: WriteStats,
    /// Set when the writer stopped early; the output holds everything
    /// written before the failure
    pub write_error: Option<SinkError>,
    /// Wall time of the whole run
    pub elapsed_ms: u64,
}

impl ExportReport {
    /// Whether every fetched record made it to the output
    pub fn is_complete(&self) -> bool {
        self.write_error.is_none()
    }
}

/// How the write loop ended
enum DrainEnd {
    EndOfStream,
    Cancelled,
    Failed(SinkError),
}

/// Coordinator for export runs
///
/// The fetcher runs on its own task; the writer runs on the task that calls
/// [`ExportCoordinator::execute`].
pub struct ExportCoordinator {
    /// Remote index to page through
    index: Arc<dyn SearchIndex>,
    /// Run parameters, never modified
    options: ExportOptions,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(index: Arc<dyn SearchIndex>, options: ExportOptions) -> Self {
        Self { index, options }
    }

    /// Open the configured output and run the export into it
    ///
    /// The output is opened before anything is fetched, so an unwritable
    /// target aborts the run without touching the index.
    ///
    /// # Returns
    /// * `Result<ExportReport>` - Run statistics, or a fatal error
    pub async fn execute(&self) -> Result<ExportReport> {
        let sink = JsonLinesSink::open(&self.options.target, self.options.compress).map_err(|e| {
            error!("Cannot open output: {}", e);
            DumpError::from(e)
        })?;
        self.execute_with_sink(Box::new(sink)).await
    }

    /// Run the export into an already opened sink
    ///
    /// This is the main pipeline:
    /// 1. Open the cursor
    /// 2. Spawn the fetcher, which pushes hits into the relay
    /// 3. Drain the relay into the sink on this task
    /// 4. Finalize the sink and join the fetcher
    ///
    /// A fetch failure is returned as [`DumpError::Fetch`] without a final
    /// summary. A write failure cancels the fetcher and is reported through
    /// [`ExportReport::write_error`] after the summary is logged.
    pub async fn execute_with_sink(&self, mut sink: Box<dyn RecordSink>) -> Result<ExportReport> {
        let start_time = Instant::now();
        let opts = &self.options;

        info!(
            "Starting export to {} (filter: {}, max records: {}, gzip: {})",
            opts.target, opts.filter, opts.max_records, opts.compress
        );

        let cursor = self.index.open_scroll(&opts.filter, opts.page_size).await?;
        let (producer, mut consumer) = relay::<Hit>(opts.queue_capacity);
        let cancel = CancellationToken::new();

        let fetcher = CursorFetcher::new(
            cursor,
            producer,
            opts.max_records,
            opts.exhaustion_threshold,
            opts.page_report_interval,
            cancel.clone(),
        );
        let fetch_task = tokio::spawn(fetcher.run());

        let mut progress = WriteProgress::new(opts.item_report_interval, opts.progress_bar);
        let end = Self::drain(&mut consumer, sink.as_mut(), &mut progress, &cancel).await;

        let mut write_error = match end {
            DrainEnd::Failed(e) => {
                error!("Write failed after {} records, stopping: {}", progress.stats().items, e);
                // Stop the fetcher, which may be parked on a full relay
                cancel.cancel();
                consumer.close();
                Some(e)
            }
            DrainEnd::Cancelled => {
                debug!("Writer stopped by cancellation");
                None
            }
            DrainEnd::EndOfStream => None,
        };
        drop(consumer);

        let finalized = sink.finalize().await;
        let write = progress.finish();

        let fetch = match fetch_task.await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => return Err(e.into()),
            Err(join_error) => {
                return Err(DumpError::Generic(format!("Fetcher task failed: {join_error}")));
            }
        };

        let output_bytes = match finalized {
            Ok(size) => size,
            Err(e) => {
                error!("Failed to finalize output: {}", e);
                if write_error.is_none() {
                    write_error = Some(e);
                }
                0
            }
        };

        if fetch.reason == StopReason::Cancelled && write_error.is_none() {
            warn!("Fetcher was cancelled before the export completed");
        }

        let summary = ExportSummary {
            items: write.items,
            raw_bytes: write.bytes,
            compressed_bytes: sink.is_compressed().then_some(output_bytes),
            write_time: write.elapsed,
        };
        summary.log();

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Export finished in {} ms: {} fetched, {} written",
            elapsed_ms, fetch.stats.records, write.items
        );

        Ok(ExportReport {
            summary,
            fetch,
            write,
            write_error,
            elapsed_ms,
        })
    }

    /// Serialize and write relay items until end-of-stream or failure
    async fn drain(
        consumer: &mut RelayConsumer<Hit>,
        sink: &mut dyn RecordSink,
        progress: &mut WriteProgress,
        cancel: &CancellationToken,
    ) -> DrainEnd {
        loop {
            let hit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return DrainEnd::Cancelled,
                next = consumer.next() => match next {
                    Some(hit) => hit,
                    None => return DrainEnd::EndOfStream,
                },
            };

            let started = Instant::now();
            let line = match hit.to_line() {
                Ok(line) => line,
                Err(e) => return DrainEnd::Failed(SinkError::Serialize(e.to_string())),
            };
            match sink.write_line(&line).await {
                Ok(bytes) => progress.record_item(bytes, started.elapsed()),
                Err(e) => return DrainEnd::Failed(e),
            }
        }
    }
}
