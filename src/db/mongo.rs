//! MongoDB implementation of the store boundary

use bson::{doc, oid::ObjectId, Bson, Document};
use futures::StreamExt;
use mongodb::{options::IndexOptions, Client, Collection, Cursor, Database, IndexModel};
use tracing::{debug, error, info};

use crate::db::filter::Filter;
use crate::db::store::{AntiJoin, DocumentStore, FindQuery, GroupCount, GroupRow, IndexSpec};
use crate::types::{Result, SeedError};

/// MongoDB-backed `DocumentStore`
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect and verify the deployment answers a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| SeedError::Config(format!("Failed to connect to MongoDB: {}", e)))?;

        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SeedError::Config(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

/// Drain a cursor, logging and skipping entries the server failed to return
async fn drain(cursor: Cursor<Document>) -> Vec<Document> {
    cursor
        .filter_map(|doc| async {
            match doc {
                Ok(d) => Some(d),
                Err(e) => {
                    error!("Error reading document: {}", e);
                    None
                }
            }
        })
        .collect()
        .await
}

fn group_pipeline(query: &GroupCount) -> Vec<Document> {
    let key = format!("${}", query.key);
    let id = match &query.partition {
        Some(partition) => Bson::Document(doc! { "key": key, "partition": format!("${}", partition) }),
        None => Bson::String(key),
    };
    vec![
        doc! { "$match": query.filter.to_document() },
        doc! { "$group": { "_id": id, "count": { "$sum": 1 } } },
    ]
}

fn anti_join_pipeline(join: &AntiJoin) -> Vec<Document> {
    let mut pipeline = vec![doc! { "$match": join.filter.to_document() }];
    let mut unresolved = Vec::with_capacity(join.keys.len());
    for (i, key) in join.keys.iter().enumerate() {
        let alias = format!("__ref_{}", i);
        pipeline.push(doc! {
            "$lookup": {
                "from": key.references.clone(),
                "localField": key.field.clone(),
                "foreignField": "_id",
                "as": alias.clone(),
            }
        });
        // Fewer matches than distinct referenced ids; scalars count as one-element arrays
        let local = format!("${}", key.field);
        unresolved.push(doc! {
            "$lt": [
                { "$size": format!("${}", alias) },
                { "$size": { "$setUnion": [
                    { "$cond": [{ "$isArray": local.clone() }, local.clone(), [local]] }
                ] } },
            ]
        });
    }
    pipeline.push(doc! { "$match": { "$expr": { "$or": unresolved } } });
    pipeline.push(doc! { "$project": { "_id": 1 } });
    pipeline
}

fn group_row(row: Document) -> Option<GroupRow> {
    let count = match row.get("count")? {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        _ => return None,
    };
    match row.get("_id")? {
        Bson::Document(id) => Some(GroupRow {
            key: id.get("key").cloned().unwrap_or(Bson::Null),
            partition: Some(id.get("partition").cloned().unwrap_or(Bson::Null)),
            count,
        }),
        key => Some(GroupRow {
            key: key.clone(),
            partition: None,
            count,
        }),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.inserted_ids.len())
    }

    async fn find(&self, collection: &str, query: FindQuery) -> Result<Vec<Document>> {
        let coll = self.collection(collection);
        let mut action = coll.find(query.filter.to_document());
        if let Some((field, order)) = &query.sort {
            action = action.sort(doc! { field: order.as_i32() });
        }
        if let Some(fields) = &query.projection {
            let mut projection = Document::new();
            for field in fields {
                projection.insert(field.clone(), 1);
            }
            action = action.projection(projection);
        }
        let cursor = action.await?;
        Ok(drain(cursor).await)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let result = self
            .collection(collection)
            .update_one(filter.to_document(), doc! { "$set": set })
            .await?;
        Ok(result.matched_count)
    }

    async fn update_many(&self, collection: &str, filter: &Filter, set: Document) -> Result<u64> {
        let result = self
            .collection(collection)
            .update_many(filter.to_document(), doc! { "$set": set })
            .await?;
        Ok(result.matched_count)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter.to_document())
            .await?;
        Ok(result.deleted_count)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self
            .collection(collection)
            .count_documents(filter.to_document())
            .await?)
    }

    async fn group_count(&self, collection: &str, query: &GroupCount) -> Result<Vec<GroupRow>> {
        let pipeline = group_pipeline(query);
        debug!(collection, ?pipeline, "Running group pipeline");
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(drain(cursor).await.into_iter().filter_map(group_row).collect())
    }

    async fn anti_join(&self, collection: &str, join: &AntiJoin) -> Result<Vec<ObjectId>> {
        let pipeline = anti_join_pipeline(join);
        debug!(collection, ?pipeline, "Running anti-join pipeline");
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(drain(cursor)
            .await
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect())
    }

    async fn create_indexes(&self, collection: &str, indexes: Vec<IndexSpec>) -> Result<()> {
        if indexes.is_empty() {
            return Ok(());
        }

        let models: Vec<IndexModel> = indexes
            .into_iter()
            .map(|spec| {
                IndexModel::builder()
                    .keys(spec.keys)
                    .options(
                        IndexOptions::builder()
                            .name(spec.name)
                            .unique(spec.unique)
                            .expire_after(spec.expire_after)
                            .build(),
                    )
                    .build()
            })
            .collect();

        self.collection(collection)
            .create_indexes(models)
            .await
            .map_err(|e| SeedError::Database(format!("Failed to create indexes: {}", e)))?;
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        self.collection(collection).drop_index(name).await?;
        Ok(())
    }

    async fn drop_indexes(&self, collection: &str) -> Result<()> {
        self.collection(collection).drop_indexes().await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.db.list_collection_names().await?)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collection(collection).drop().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::ForeignKey;

    // Live-server behaviour is covered through MemoryStore; these check the
    // pipelines sent to the server.

    #[test]
    fn test_group_pipeline_shapes() {
        let plain = group_pipeline(&GroupCount::by("followee_id").matching(Filter::eq("status", "accepted")));
        assert_eq!(plain[0], doc! { "$match": { "status": "accepted" } });
        assert_eq!(
            plain[1],
            doc! { "$group": { "_id": "$followee_id", "count": { "$sum": 1 } } }
        );

        let partitioned = group_pipeline(&GroupCount::by("event_id").partitioned_by("status"));
        let group = partitioned[1].get_document("$group").unwrap();
        assert_eq!(
            group.get_document("_id").unwrap(),
            &doc! { "key": "$event_id", "partition": "$status" }
        );
    }

    #[test]
    fn test_anti_join_pipeline_checks_every_key() {
        let pipeline = anti_join_pipeline(&AntiJoin {
            filter: Filter::All,
            keys: vec![
                ForeignKey::new("follower_id", "users"),
                ForeignKey::new("followee_id", "users"),
            ],
        });
        assert_eq!(pipeline.len(), 5);
        let or = pipeline[3]
            .get_document("$match")
            .unwrap()
            .get_document("$expr")
            .unwrap()
            .get_array("$or")
            .unwrap();
        assert_eq!(or.len(), 2);
    }

    #[test]
    fn test_group_row_decoding() {
        let row = group_row(doc! { "_id": { "key": 1, "partition": "going" }, "count": 3 }).unwrap();
        assert_eq!(row.count, 3);
        assert_eq!(row.partition, Some(Bson::String("going".into())));
        assert!(group_row(doc! { "_id": 1 }).is_none());
    }
}
