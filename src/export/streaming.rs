//! Cursor abstractions over the remote search index
//!
//! The pipeline only needs two capabilities from the index: open a cursor for
//! a filter and page size, then pull pages from it until it runs dry. Both are
//! traits so the export can run against Elasticsearch or an in-memory index.

use async_trait::async_trait;

use crate::error::FetchError;

use super::record::{Filter, Page};

/// Result type for cursor operations. Every failure here is fatal to a run.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// A server-side cursor that yields pages in order
///
/// Pages cannot be re-requested once returned; there is no random access.
#[async_trait]
pub trait ScrollCursor: Send {
    /// Fetch the next page of hits
    ///
    /// # Returns
    /// * `FetchResult<Page>` - Next page, empty once the index is drained
    async fn next_page(&mut self) -> FetchResult<Page>;

    /// Release the server-side cursor
    async fn close(&mut self) -> FetchResult<()>;
}

/// A remote index that can be paged through with a cursor
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Open a cursor over every document matching `filter`
    ///
    /// # Arguments
    /// * `filter` - Query fragment, passed to the server unmodified
    /// * `page_size` - Number of hits to request per page
    async fn open_scroll(&self, filter: &Filter, page_size: usize) -> FetchResult<Box<dyn ScrollCursor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_trait_objects() {
        fn _accepts_cursor(_cursor: Box<dyn ScrollCursor>) {}
        fn _accepts_index(_index: std::sync::Arc<dyn SearchIndex>) {}
    }
}
