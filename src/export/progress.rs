//! Progress accounting for export runs
//!
//! Each stage owns its own counters: the fetcher owns a [`FetchProgress`],
//! the writer owns a [`WriteProgress`]. Nothing is shared between the two
//! tasks, so no synchronization is needed. Both log a summary line every
//! fixed number of pages or items, and their final stats feed the
//! [`ExportSummary`] logged at the end of a run.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Convert a byte count to megabytes, truncated to two decimals
pub fn megabytes(bytes: u64) -> f64 {
    let hundredths = (bytes as f64 / (1024.0 * 1024.0) * 100.0).trunc();
    hundredths / 100.0
}

/// Counters owned by the fetch stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FetchStats {
    /// Hits pushed into the relay
    pub records: u64,
    /// Pages received from the cursor
    pub pages: u64,
    /// Time spent waiting on the index
    pub elapsed: Duration,
}

/// Fetch-side accountant
#[derive(Debug)]
pub struct FetchProgress {
    stats: FetchStats,
    since_report: Duration,
    interval: u64,
}

impl FetchProgress {
    /// # Arguments
    /// * `interval` - Log accumulated fetch time every this many pages
    pub fn new(interval: u64) -> Self {
        Self {
            stats: FetchStats::default(),
            since_report: Duration::ZERO,
            interval: interval.max(1),
        }
    }

    /// Account for one page request that took `spent`
    pub fn record_page(&mut self, spent: Duration) {
        self.stats.pages += 1;
        self.stats.elapsed += spent;
        self.since_report += spent;

        if self.stats.pages % self.interval == 0 {
            info!(
                pages = self.stats.pages,
                "{} pages fetch time {:.3}s",
                self.interval,
                self.since_report.as_secs_f64()
            );
            self.since_report = Duration::ZERO;
        }
    }

    /// Account for one hit pushed into the relay
    pub fn record_pushed(&mut self) {
        self.stats.records += 1;
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Log the total fetch time and hand back the counters
    pub fn finish(self) -> FetchStats {
        info!(
            records = self.stats.records,
            pages = self.stats.pages,
            "total fetch time {:.3}s",
            self.stats.elapsed.as_secs_f64()
        );
        self.stats
    }
}

/// Counters owned by the write stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WriteStats {
    /// Records fully written to the sink
    pub items: u64,
    /// Serialized bytes written, line terminators included, before compression
    pub bytes: u64,
    /// Time spent serializing and writing
    pub elapsed: Duration,
}

/// Write-side accountant, with an optional terminal spinner
pub struct WriteProgress {
    stats: WriteStats,
    since_report: Duration,
    interval: u64,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl WriteProgress {
    /// # Arguments
    /// * `interval` - Log progress every this many items
    /// * `enable_bar` - Whether to draw a spinner on stderr
    pub fn new(interval: u64, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {pos} documents {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self {
            stats: WriteStats::default(),
            since_report: Duration::ZERO,
            interval: interval.max(1),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Account for one record of `bytes` bytes written in `spent`
    pub fn record_item(&mut self, bytes: u64, spent: Duration) {
        self.stats.items += 1;
        self.stats.bytes += bytes;
        self.stats.elapsed += spent;
        self.since_report += spent;

        if let Some(ref bar) = self.bar {
            bar.set_position(self.stats.items);
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("({:.0} docs/sec)", self.stats.items as f64 / elapsed));
            }
        }

        if self.stats.items % self.interval == 0 {
            info!(
                "total exported {} items; total_raw_bytes: {:.2} MB; write time {:.3}s",
                self.stats.items,
                megabytes(self.stats.bytes),
                self.since_report.as_secs_f64()
            );
            self.since_report = Duration::ZERO;
        }
    }

    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    /// Clear the spinner and hand back the counters
    pub fn finish(self) -> WriteStats {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        self.stats
    }
}

/// Final numbers of a run, logged once at shutdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    pub items: u64,
    pub raw_bytes: u64,
    /// Bytes that reached the output, present when compression was on
    pub compressed_bytes: Option<u64>,
    pub write_time: Duration,
}

impl ExportSummary {
    /// Emit the final summary line
    pub fn log(&self) {
        match self.compressed_bytes {
            Some(compressed) => info!(
                "total exported {} items; total_raw_bytes: {:.2} MB; the gzip size: {:.2} MB",
                self.items,
                megabytes(self.raw_bytes),
                megabytes(compressed)
            ),
            None => info!(
                "total exported {} items; total_raw_bytes: {:.2} MB; write time {:.3}s",
                self.items,
                megabytes(self.raw_bytes),
                self.write_time.as_secs_f64()
            ),
        }
    }
}
