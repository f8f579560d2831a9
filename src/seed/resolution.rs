//! Referential resolution
//!
//! Decides which copy of a stage's output later stages build on. Optimistic
//! resolution trusts the in-memory entities that were just written.
//! Synchronized resolution reads the written documents back and hands on
//! what the store actually holds, including any server-side defaults.

use bson::oid::ObjectId;
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{insert_entities, schemas::Entity, DocumentStore, Filter, FindQuery, SortOrder};
use crate::types::Result;

/// IDs per read-back query
const READ_BACK_CHUNK: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    Optimistic,
    Synchronized,
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimistic => write!(f, "optimistic"),
            Self::Synchronized => write!(f, "synchronized"),
        }
    }
}

/// Canonical entities after persistence
#[derive(Debug)]
pub struct Materialized<T> {
    pub entities: Vec<T>,
    pub persisted: usize,
    /// Read-back documents that failed to decode
    pub decode_skipped: usize,
}

/// Persists stage output and resolves the canonical entities
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    mode: ResolutionMode,
    batch_size: usize,
}

impl Resolver {
    pub fn new(mode: ResolutionMode, batch_size: usize) -> Self {
        Self { mode, batch_size }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Write `entities` in batches and return the copies later stages should use
    pub async fn materialize<T: Entity>(
        &self,
        store: &dyn DocumentStore,
        entities: Vec<T>,
    ) -> Result<Materialized<T>> {
        let persisted = insert_entities(store, &entities, self.batch_size).await?;

        match self.mode {
            ResolutionMode::Optimistic => Ok(Materialized {
                entities,
                persisted,
                decode_skipped: 0,
            }),
            ResolutionMode::Synchronized => {
                let ids: Vec<ObjectId> = entities.iter().map(Entity::id).collect();
                drop(entities);
                let (entities, decode_skipped) = self.read_back::<T>(store, &ids).await?;
                Ok(Materialized {
                    entities,
                    persisted,
                    decode_skipped,
                })
            }
        }
    }

    async fn read_back<T: Entity>(
        &self,
        store: &dyn DocumentStore,
        ids: &[ObjectId],
    ) -> Result<(Vec<T>, usize)> {
        let mut canonical = Vec::with_capacity(ids.len());
        let mut skipped = 0;

        for chunk in ids.chunks(READ_BACK_CHUNK) {
            let query = FindQuery::new(Filter::ids(chunk)).sort_by("created_at", SortOrder::Ascending);
            for document in store.find(T::COLLECTION, query).await? {
                match bson::from_document::<T>(document) {
                    Ok(entity) => canonical.push(entity),
                    Err(e) => {
                        skipped += 1;
                        warn!(collection = T::COLLECTION, "Skipping undecodable document: {}", e);
                    }
                }
            }
        }

        // Chunks are each sorted; restore a single creation order
        canonical.sort_by_key(|e: &T| e.created_at());

        debug!(
            collection = T::COLLECTION,
            read = canonical.len(),
            skipped,
            "Read back written documents"
        );
        Ok((canonical, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Hashtag, HASHTAG_COLLECTION};
    use crate::db::MemoryStore;
    use bson::{doc, DateTime};

    fn hashtag(name: &str, millis: i64) -> Hashtag {
        Hashtag {
            id: ObjectId::new(),
            name: name.to_string(),
            created_at: DateTime::from_millis(millis),
            updated_at: DateTime::from_millis(millis),
        }
    }

    #[tokio::test]
    async fn test_optimistic_returns_input() {
        let store = MemoryStore::new();
        let resolver = Resolver::new(ResolutionMode::Optimistic, 2);
        let result = resolver
            .materialize(&store, vec![hashtag("b", 2), hashtag("a", 1)])
            .await
            .unwrap();
        assert_eq!(result.persisted, 2);
        assert_eq!(result.entities[0].name, "b");
    }

    #[tokio::test]
    async fn test_synchronized_reads_back_in_creation_order() {
        let store = MemoryStore::new();
        let resolver = Resolver::new(ResolutionMode::Synchronized, 2);
        let result = resolver
            .materialize(&store, vec![hashtag("b", 2), hashtag("c", 3), hashtag("a", 1)])
            .await
            .unwrap();
        let names: Vec<&str> = result.entities.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(result.decode_skipped, 0);
    }

    #[tokio::test]
    async fn test_synchronized_skips_undecodable_documents() {
        let store = MemoryStore::new();
        let broken = ObjectId::new();
        store
            .insert_many(HASHTAG_COLLECTION, vec![doc! { "_id": broken, "name": 42 }])
            .await
            .unwrap();

        let resolver = Resolver::new(ResolutionMode::Synchronized, 10);
        let written = hashtag("ok", 1);
        let (entities, skipped) = resolver
            .read_back::<Hashtag>(&store, &[broken, written.id])
            .await
            .unwrap();
        assert!(entities.is_empty());
        assert_eq!(skipped, 1);
    }
}
