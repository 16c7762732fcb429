// file: src/corpus/scanner.rs
// description: forward-only paginated scan of an index sorted by document id
// reference: search_after pagination

use crate::database::store::{DocumentStore, PageRequest};
use crate::error::{PipelineError, Result};
use crate::models::{Cursor, SourceRecord};
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

enum ScanState {
    Start,
    After(Cursor),
}

pub struct SourceScanner {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
    include_source: bool,
}

impl SourceScanner {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            include_source: true,
        }
    }

    /// Requests identifiers only; yielded records have empty fields.
    pub fn ids_only(mut self) -> Self {
        self.include_source = false;
        self
    }

    /// Lazily yields pages until the store returns an empty one.
    ///
    /// Each request carries the cursor of the previous page's last record,
    /// so pages are fetched strictly one after another. A fresh call always
    /// starts from the beginning of the index.
    pub fn pages(&self) -> impl Stream<Item = Result<Vec<SourceRecord>>> + Send + 'static {
        let store = Arc::clone(&self.store);
        let mut base = PageRequest::first(self.page_size);
        base.include_source = self.include_source;

        stream::try_unfold(ScanState::Start, move |state| {
            let store = Arc::clone(&store);
            let request = match state {
                ScanState::Start => base.clone(),
                ScanState::After(cursor) => base.clone().after(cursor),
            };

            async move {
                let page = store.fetch_page(&request).await?;
                let Some(last) = page.last() else {
                    debug!("Scan of {} reached an empty page", store.index_name());
                    return Ok(None);
                };
                let next = ScanState::After(last.cursor());
                Ok(Some((page, next)))
            }
        })
    }

    /// Lazily yields every record once, in id order.
    pub fn records(&self) -> impl Stream<Item = Result<SourceRecord>> + Send + 'static {
        self.pages()
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, PipelineError>)))
            .try_flatten()
    }
}
