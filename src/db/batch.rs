//! Batch persistence adapter
//!
//! Splits a write into contiguous chunks and issues one bulk insert per
//! chunk. The first failing chunk aborts the call; chunks already written
//! stay in place and nothing is retried.

use bson::Document;
use tracing::{debug, error};

use crate::db::schemas::Entity;
use crate::db::store::DocumentStore;
use crate::types::{Result, SeedError};

/// Default chunk size for bulk writes
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Insert `documents` into `collection` in chunks of at most `batch_size`
pub async fn insert_batched(
    store: &dyn DocumentStore,
    collection: &str,
    documents: Vec<Document>,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(SeedError::Config("batch size must be greater than zero".into()));
    }

    let total = documents.len();
    let mut written = 0;
    let mut remaining = documents.into_iter().peekable();
    let mut chunk_index = 0;

    while remaining.peek().is_some() {
        let chunk: Vec<Document> = remaining.by_ref().take(batch_size).collect();
        let size = chunk.len();

        match store.insert_many(collection, chunk).await {
            Ok(n) => {
                written += n;
                debug!(collection, chunk = chunk_index, size, "Inserted chunk");
            }
            Err(e) => {
                error!(collection, chunk = chunk_index, written, total, "Chunk insert failed: {}", e);
                return Err(SeedError::Batch {
                    collection: collection.to_string(),
                    chunk: chunk_index,
                    reason: e.to_string(),
                });
            }
        }
        chunk_index += 1;
    }

    Ok(written)
}

/// Serialize entities and insert them in chunks
pub async fn insert_entities<T: Entity>(
    store: &dyn DocumentStore,
    entities: &[T],
    batch_size: usize,
) -> Result<usize> {
    let documents = entities
        .iter()
        .map(bson::to_document)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    insert_batched(store, T::COLLECTION, documents, batch_size).await
}
