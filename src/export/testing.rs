//! In-memory index used by the pipeline tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::FetchError;

use super::record::{Filter, Hit, Page};
use super::streaming::{FetchResult, ScrollCursor, SearchIndex};

#[derive(Default)]
struct Journal {
    pages: Vec<usize>,
    filters: Vec<String>,
    closed: bool,
}

/// Index holding `n` hits with ids `"0"..n`
#[derive(Clone)]
pub(crate) struct MemoryIndex {
    hits: Arc<Vec<Hit>>,
    fail_at: Option<usize>,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryIndex {
    pub(crate) fn with_records(n: usize) -> Self {
        let hits = (0..n)
            .map(|i| {
                Hit::from_json(&format!(
                    r#"{{"_index":"test","_id":"{i}","_score":1.0,"_source":{{"n":{i},"body":"document {i}"}}}}"#
                ))
                .unwrap()
            })
            .collect();
        Self {
            hits: Arc::new(hits),
            fail_at: None,
            journal: Arc::default(),
        }
    }

    /// Make the `request`-th page request (0-based) fail
    pub(crate) fn failing_at_page(mut self, request: usize) -> Self {
        self.fail_at = Some(request);
        self
    }

    /// Sizes of the pages handed out so far
    pub(crate) fn served_pages(&self) -> Vec<usize> {
        self.journal.lock().unwrap().pages.clone()
    }

    pub(crate) fn seen_filters(&self) -> Vec<String> {
        self.journal.lock().unwrap().filters.clone()
    }

    pub(crate) fn was_closed(&self) -> bool {
        self.journal.lock().unwrap().closed
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn open_scroll(&self, filter: &Filter, page_size: usize) -> FetchResult<Box<dyn ScrollCursor>> {
        filter.to_query()?;
        self.journal.lock().unwrap().filters.push(filter.to_string());
        Ok(Box::new(MemoryCursor {
            hits: self.hits.clone(),
            position: 0,
            page_size,
            requests: 0,
            fail_at: self.fail_at,
            journal: self.journal.clone(),
        }))
    }
}

struct MemoryCursor {
    hits: Arc<Vec<Hit>>,
    position: usize,
    page_size: usize,
    requests: usize,
    fail_at: Option<usize>,
    journal: Arc<Mutex<Journal>>,
}

#[async_trait]
impl ScrollCursor for MemoryCursor {
    async fn next_page(&mut self) -> FetchResult<Page> {
        let request = self.requests;
        self.requests += 1;
        if self.fail_at == Some(request) {
            return Err(FetchError::ConnectionFailed("injected failure".to_string()));
        }

        let end = (self.position + self.page_size).min(self.hits.len());
        let page = self.hits[self.position..end].to_vec();
        self.position = end;
        self.journal.lock().unwrap().pages.push(page.len());
        Ok(page)
    }

    async fn close(&mut self) -> FetchResult<()> {
        self.journal.lock().unwrap().closed = true;
        Ok(())
    }
}
