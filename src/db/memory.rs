//! In-process document store
//!
//! Implements the full `DocumentStore` surface over plain maps so generation,
//! pruning, recomputation and migrations can be exercised without a server.
//! Unique indexes are enforced on insert. Insert failures can be injected per
//! collection to test batch abort behaviour.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::db::filter::{compare, lookup, Filter};
use crate::db::store::{
    AntiJoin, DocumentStore, FindQuery, GroupCount, GroupRow, IndexSpec, SortOrder,
};
use crate::types::{Result, SeedError};

#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    /// Remaining successful insert calls per collection before one fails
    insert_failures: HashMap<String, usize>,
}

/// Memory-backed `DocumentStore`
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `after_calls` insert calls into `collection` succeed, then fail the next one
    pub async fn inject_insert_failure(&self, collection: &str, after_calls: usize) {
        self.inner
            .write()
            .await
            .insert_failures
            .insert(collection.to_string(), after_calls);
    }

    /// Names of the indexes currently defined on a collection
    pub async fn index_names(&self, collection: &str) -> Vec<String> {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every document in a collection, in insertion order
    pub async fn dump(&self, collection: &str) -> Vec<Document> {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }
}

fn key_string(value: Option<&Bson>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "null".to_string(),
    }
}

fn index_key(index: &IndexSpec, document: &Document) -> String {
    index
        .keys
        .keys()
        .map(|field| key_string(lookup(document, field)))
        .collect::<Vec<_>>()
        .join("|")
}

fn project(document: &Document, fields: &[String]) -> Document {
    let mut projected = Document::new();
    if let Some(id) = document.get("_id") {
        projected.insert("_id", id.clone());
    }
    for field in fields {
        let top = field.split('.').next().unwrap_or(field);
        if let Some(value) = document.get(top) {
            projected.insert(top, value.clone());
        }
    }
    projected
}

fn sort_documents(documents: &mut [Document], field: &str, order: SortOrder) {
    documents.sort_by(|a, b| {
        let ordering = match (lookup(a, field), lookup(b, field)) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => compare(x, y).unwrap_or(std::cmp::Ordering::Equal),
        };
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn apply_set(document: &mut Document, set: &Document) {
    for (field, value) in set {
        document.insert(field.clone(), value.clone());
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(remaining) = inner.insert_failures.get_mut(collection) {
            if *remaining == 0 {
                inner.insert_failures.remove(collection);
                return Err(SeedError::Database(format!(
                    "injected insert failure on '{}'",
                    collection
                )));
            }
            *remaining -= 1;
        }

        let target = inner.collections.entry(collection.to_string()).or_default();

        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            prepared.push(document);
        }

        let mut seen_ids: HashSet<String> = target
            .documents
            .iter()
            .map(|d| key_string(d.get("_id")))
            .collect();
        for document in &prepared {
            if !seen_ids.insert(key_string(document.get("_id"))) {
                return Err(SeedError::Database(format!(
                    "duplicate key on '{}' _id {}",
                    collection,
                    key_string(document.get("_id"))
                )));
            }
        }

        for index in target.indexes.iter().filter(|i| i.unique) {
            let mut seen: HashSet<String> = target
                .documents
                .iter()
                .map(|d| index_key(index, d))
                .collect();
            for document in &prepared {
                if !seen.insert(index_key(index, document)) {
                    return Err(SeedError::Database(format!(
                        "duplicate key on '{}' index {}",
                        collection, index.name
                    )));
                }
            }
        }

        let written = prepared.len();
        target.documents.extend(prepared);
        Ok(written)
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let Some(target) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<Document> = target
            .documents
            .iter()
            .filter(|d| query.filter.matches(d))
            .cloned()
            .collect();

        if let Some((field, order)) = &query.sort {
            sort_documents(&mut found, field, *order);
        }

        if let Some(fields) = &query.projection {
            found = found.iter().map(|d| project(d, fields)).collect();
        }

        Ok(found)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(target) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        match target.documents.iter_mut().find(|d| filter.matches(d)) {
            Some(document) => {
                apply_set(document, &set);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_many(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(target) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut modified = 0;
        for document in target.documents.iter_mut().filter(|d| filter.matches(d)) {
            apply_set(document, &set);
            modified += 1;
        }
        Ok(modified)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(target) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = target.documents.len();
        target.documents.retain(|d| !filter.matches(d));
        Ok((before - target.documents.len()) as u64)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .map(|c| c.documents.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn group_count(&self, collection: &str, query: &GroupCount) -> Result<Vec<GroupRow>> {
        let inner = self.inner.read().await;
        let Some(target) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut groups: BTreeMap<(String, String), GroupRow> = BTreeMap::new();
        for document in target.documents.iter().filter(|d| query.filter.matches(d)) {
            let key = lookup(document, &query.key).cloned().unwrap_or(Bson::Null);
            let partition = query
                .partition
                .as_ref()
                .map(|field| lookup(document, field).cloned().unwrap_or(Bson::Null));
            let slot = (
                key.to_string(),
                partition.as_ref().map(Bson::to_string).unwrap_or_default(),
            );
            groups
                .entry(slot)
                .or_insert_with(|| GroupRow {
                    key,
                    partition,
                    count: 0,
                })
                .count += 1;
        }

        Ok(groups.into_values().collect())
    }

    async fn anti_join(&self, collection: &str, join: &AntiJoin) -> Result<Vec<ObjectId>> {
        let inner = self.inner.read().await;
        let Some(target) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let referenced: Vec<HashSet<String>> = join
            .keys
            .iter()
            .map(|key| {
                inner
                    .collections
                    .get(&key.references)
                    .map(|c| c.documents.iter().map(|d| key_string(d.get("_id"))).collect())
                    .unwrap_or_default()
            })
            .collect();

        let orphans = target
            .documents
            .iter()
            .filter(|d| join.filter.matches(d))
            .filter(|d| {
                join.keys.iter().zip(&referenced).any(|(key, ids)| {
                    match lookup(d, &key.field) {
                        None | Some(Bson::Null) => true,
                        Some(Bson::Array(items)) => items.iter().any(|item| !ids.contains(&item.to_string())),
                        Some(value) => !ids.contains(&value.to_string()),
                    }
                })
            })
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();

        Ok(orphans)
    }

    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let target = inner.collections.entry(collection.to_string()).or_default();
        for index in indexes {
            // Same name replaces, matching createIndexes being idempotent
            target.indexes.retain(|existing| existing.name != index.name);
            target.indexes.push(index);
        }
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let target = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| SeedError::Database(format!("ns not found: {}", collection)))?;
        let before = target.indexes.len();
        target.indexes.retain(|index| index.name != name);
        if target.indexes.len() == before {
            return Err(SeedError::Database(format!(
                "index not found with name [{}]",
                name
            )));
        }
        Ok(())
    }

    async fn drop_indexes(&self, collection: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(target) = inner.collections.get_mut(collection) {
            target.indexes.clear();
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.collections.keys().cloned().collect())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.inner.write().await.collections.remove(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::ForeignKey;
    use bson::doc;

    #[tokio::test]
    async fn test_insert_assigns_missing_ids() {
        let store = MemoryStore::new();
        let written = store
            .insert_many("posts", vec![doc! { "content": "a" }, doc! { "content": "b" }])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let found = store.find("posts", FindQuery::all()).await.unwrap();
        assert!(found.iter().all(|d| d.get_object_id("_id").is_ok()));
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .create_indexes(
                "migrations",
                vec![IndexSpec::new(doc! { "version": 1 }, "version_unique").unique()],
            )
            .await
            .unwrap();
        store
            .insert_many("migrations", vec![doc! { "version": "001" }])
            .await
            .unwrap();

        let err = store
            .insert_many("migrations", vec![doc! { "version": "001" }])
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Database(_)));
        assert_eq!(store.dump("migrations").await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.inject_insert_failure("likes", 1).await;

        assert!(store.insert_many("likes", vec![doc! {}]).await.is_ok());
        assert!(store.insert_many("likes", vec![doc! {}]).await.is_err());
        assert!(store.insert_many("likes", vec![doc! {}]).await.is_ok());
        assert_eq!(store.dump("likes").await.len(), 2);
    }

    #[tokio::test]
    async fn test_find_sorts_and_projects() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "users",
                vec![
                    doc! { "username": "b", "age": 30 },
                    doc! { "username": "a", "age": 20 },
                ],
            )
            .await
            .unwrap();

        let found = store
            .find(
                "users",
                FindQuery::all()
                    .sort_by("username", SortOrder::Descending)
                    .project(["username"]),
            )
            .await
            .unwrap();
        assert_eq!(found[0].get_str("username").unwrap(), "b");
        assert!(found[0].get("age").is_none());
    }

    #[tokio::test]
    async fn test_group_count_with_partition() {
        let store = MemoryStore::new();
        let event = ObjectId::new();
        store
            .insert_many(
                "event_rsvps",
                vec![
                    doc! { "event_id": event, "status": "going" },
                    doc! { "event_id": event, "status": "going" },
                    doc! { "event_id": event, "status": "maybe" },
                ],
            )
            .await
            .unwrap();

        let rows = store
            .group_count("event_rsvps", &GroupCount::by("event_id").partitioned_by("status"))
            .await
            .unwrap();
        let going = rows
            .iter()
            .find(|r| r.partition == Some(Bson::String("going".into())))
            .unwrap();
        assert_eq!(going.count, 2);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_anti_join_finds_dangling_references() {
        let store = MemoryStore::new();
        let alive = ObjectId::new();
        store
            .insert_many("users", vec![doc! { "_id": alive }])
            .await
            .unwrap();
        store
            .insert_many(
                "follows",
                vec![
                    doc! { "follower_id": alive, "followee_id": alive },
                    doc! { "follower_id": alive, "followee_id": ObjectId::new() },
                ],
            )
            .await
            .unwrap();

        let join = AntiJoin {
            filter: Filter::All,
            keys: vec![
                ForeignKey::new("follower_id", "users"),
                ForeignKey::new("followee_id", "users"),
            ],
        };
        let orphans = store.anti_join("follows", &join).await.unwrap();
        assert_eq!(orphans.len(), 1);
    }

    #[tokio::test]
    async fn test_anti_join_requires_every_array_element() {
        let store = MemoryStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());
        store
            .insert_many("users", vec![doc! { "_id": a }, doc! { "_id": b }])
            .await
            .unwrap();
        let partial = ObjectId::new();
        store
            .insert_many(
                "conversations",
                vec![
                    doc! { "participants": [a, b] },
                    doc! { "_id": partial, "participants": [a, ObjectId::new()] },
                    doc! { "participants": [] },
                ],
            )
            .await
            .unwrap();

        let join = AntiJoin {
            filter: Filter::All,
            keys: vec![ForeignKey::new("participants", "users")],
        };
        assert_eq!(store.anti_join("conversations", &join).await.unwrap(), vec![partial]);
    }
}
