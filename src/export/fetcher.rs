//! Fetch stage: pages through the cursor and feeds the relay
//!
//! Runs as its own task. Pages are requested strictly one after another and
//! the next request is only made once every hit of the previous page has
//! been pushed, so a full relay holds back the network as well.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FetchError;

use super::progress::{FetchProgress, FetchStats};
use super::record::Hit;
use super::relay::RelayProducer;
use super::streaming::{FetchResult, ScrollCursor};

/// Why the fetcher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back shorter than the exhaustion threshold
    Exhausted,
    /// The record cap was reached
    CapReached,
    /// The run was cancelled, or the writer went away
    Cancelled,
}

/// Outcome of a fetcher that stopped without error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchReport {
    pub stats: FetchStats,
    pub reason: StopReason,
}

/// Drives a [`ScrollCursor`] into a relay
pub struct CursorFetcher {
    cursor: Box<dyn ScrollCursor>,
    producer: RelayProducer<Hit>,
    /// 0 means unbounded
    max_records: u64,
    exhaustion_threshold: usize,
    progress: FetchProgress,
    cancel: CancellationToken,
}

impl CursorFetcher {
    pub fn new(
        cursor: Box<dyn ScrollCursor>,
        producer: RelayProducer<Hit>,
        max_records: u64,
        exhaustion_threshold: usize,
        page_report_interval: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cursor,
            producer,
            max_records,
            exhaustion_threshold,
            progress: FetchProgress::new(page_report_interval),
            cancel,
        }
    }

    /// Page through the cursor until exhaustion, the cap, or cancellation
    ///
    /// Whatever the outcome, the relay is closed before returning. A fetch
    /// error also cancels the run's token so the writer stops at once.
    pub async fn run(mut self) -> FetchResult<FetchReport> {
        let outcome = self.pump().await;

        let Self {
            mut cursor,
            producer,
            progress,
            cancel,
            ..
        } = self;

        if outcome.is_err() {
            cancel.cancel();
        }
        producer.close();
        let stats = progress.finish();

        match outcome {
            Ok(reason) => {
                if let Err(e) = cursor.close().await {
                    warn!("Failed to release scroll cursor: {}", e);
                }
                info!(
                    "Fetcher stopped ({:?}) after {} records in {} pages",
                    reason, stats.records, stats.pages
                );
                Ok(FetchReport { stats, reason })
            }
            Err(e) => {
                error!("Scroll request failed after {} pages: {}", stats.pages, e);
                Err(e)
            }
        }
    }

    fn cap_reached(&self) -> bool {
        self.max_records > 0 && self.progress.stats().records >= self.max_records
    }

    async fn pump(&mut self) -> Result<StopReason, FetchError> {
        let mut exhausted = false;

        while !self.cap_reached() && !exhausted {
            let started = Instant::now();
            let page = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
                page = self.cursor.next_page() => page?,
            };
            self.progress.record_page(started.elapsed());

            let len = page.len();
            exhausted = len == 0 || len < self.exhaustion_threshold;
            debug!(
                "Page #{} with {} hits (relay occupancy {}/{})",
                self.progress.stats().pages,
                len,
                self.producer.occupancy(),
                self.producer.capacity()
            );

            for hit in page {
                let pushed = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => false,
                    sent = self.producer.push(hit) => sent.is_ok(),
                };
                if !pushed {
                    return Ok(StopReason::Cancelled);
                }
                self.progress.record_pushed();
                if self.cap_reached() {
                    break;
                }
            }
        }

        Ok(if self.cap_reached() {
            StopReason::CapReached
        } else {
            StopReason::Exhausted
        })
    }
}
