//! Document store boundary
//!
//! Everything the generator and the maintenance tools need from a database
//! goes through `DocumentStore`. `MongoStore` talks to a real deployment,
//! `MemoryStore` keeps collections in process for tests.

use std::time::Duration;

use bson::{oid::ObjectId, Bson, Document};

use crate::db::filter::Filter;
use crate::types::Result;

/// Sort direction for `find`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Filter, sort and projection for a read
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<(String, SortOrder)>,
    /// Fields to keep; `_id` is always returned
    pub projection: Option<Vec<String>>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            sort: None,
            projection: None,
        }
    }

    pub fn all() -> Self {
        Self::new(Filter::All)
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// `$match` + `$group` counting query
///
/// Produces one row per distinct `key` value, or per (`key`, `partition`) pair
/// when a partition field is given.
#[derive(Debug, Clone)]
pub struct GroupCount {
    pub filter: Filter,
    pub key: String,
    pub partition: Option<String>,
}

impl GroupCount {
    pub fn by(key: impl Into<String>) -> Self {
        Self {
            filter: Filter::All,
            key: key.into(),
            partition: None,
        }
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn partitioned_by(mut self, field: impl Into<String>) -> Self {
        self.partition = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Bson,
    pub partition: Option<Bson>,
    pub count: i64,
}

/// A reference from `field` to `_id` in another collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: String,
    pub references: String,
}

impl ForeignKey {
    pub fn new(field: impl Into<String>, references: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            references: references.into(),
        }
    }
}

/// Left anti-join: documents matching `filter` where any key fails to resolve
///
/// An array-valued key resolves only when every element does.
#[derive(Debug, Clone)]
pub struct AntiJoin {
    pub filter: Filter,
    pub keys: Vec<ForeignKey>,
}

/// Index definition applied through `create_indexes`
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub keys: Document,
    pub name: String,
    pub unique: bool,
    pub expire_after: Option<Duration>,
}

impl IndexSpec {
    pub fn new(keys: Document, name: impl Into<String>) -> Self {
        Self {
            keys,
            name: name.into(),
            unique: false,
            expire_after: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }
}

/// Collection-level operations against a document database
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents in one bulk write, returning how many were written
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize>;

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>>;

    /// `$set` the given fields on the first match
    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64>;

    /// `$set` the given fields on every match
    async fn update_many(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn group_count(&self, collection: &str, query: &GroupCount) -> Result<Vec<GroupRow>>;

    /// IDs of documents whose references do not resolve
    async fn anti_join(&self, collection: &str, join: &AntiJoin) -> Result<Vec<ObjectId>>;

    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Result<()>;

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()>;

    /// Drop every index except `_id`
    async fn drop_indexes(&self, collection: &str) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn drop_collection(&self, collection: &str) -> Result<()>;
}
