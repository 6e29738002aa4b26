//! Offset-paged iteration over a collection's documents.

use dbtweak_proto::Document;

use crate::error::{Error, Result};
use crate::store::DocumentStore;

/// Walks every document of a collection one page at a time.
///
/// The total is captured from the first page. Documents inserted or deleted
/// during iteration may be skipped or seen twice; callers are expected to
/// run against a quiescent collection. A cursor cannot be restarted.
pub struct DocumentCursor<'a, S: ?Sized> {
    store: &'a S,
    collection: String,
    page_size: usize,
    offset: u64,
    total: u64,
    pending: Option<Vec<Document>>,
}

impl<'a, S: DocumentStore + ?Sized> DocumentCursor<'a, S> {
    /// Fetch the first page and capture the collection total.
    pub async fn open(store: &'a S, collection: &str, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }

        let first = store.list_documents(collection, page_size, 0).await?;
        Ok(Self {
            store,
            collection: collection.to_string(),
            page_size,
            offset: page_size as u64,
            total: first.total,
            pending: Some(first.documents),
        })
    }

    /// Total reported when the cursor was opened.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether another call to [`next_batch`](Self::next_batch) may yield
    /// documents.
    pub fn has_more(&self) -> bool {
        self.pending.is_some() || self.offset < self.total
    }

    /// Next page of documents, `None` once the collection is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Document>>> {
        let documents = match self.pending.take() {
            Some(documents) => documents,
            None => {
                if self.offset >= self.total {
                    return Ok(None);
                }
                let page = self
                    .store
                    .list_documents(&self.collection, self.page_size, self.offset)
                    .await?;
                self.offset += self.page_size as u64;
                page.documents
            }
        };

        if documents.is_empty() {
            // The collection shrank underneath us.
            self.offset = self.total;
            return Ok(None);
        }
        Ok(Some(documents))
    }
}
