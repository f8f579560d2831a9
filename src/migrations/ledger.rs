//! Applied-migration ledger

use std::collections::HashMap;

use bson::{doc, DateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::schemas::{IntoIndexes, MIGRATION_COLLECTION};
use crate::db::{DocumentStore, Filter, FindQuery, IndexSpec, SortOrder};
use crate::migrations::{validate, Migration, ValidationReport};
use crate::types::{Result, SeedError};

/// One row of the `migrations` collection
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MigrationRecord {
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub applied: bool,
    pub applied_at: DateTime,
    pub created_at: DateTime,
}

impl IntoIndexes for MigrationRecord {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "version": 1 }, "version_unique").unique()]
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MigrationStatus {
    pub id: String,
    pub description: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime>,
}

/// A validated migration list bound to a store
pub struct MigrationLedger<'a> {
    store: &'a dyn DocumentStore,
    migrations: Vec<Migration>,
    validation: ValidationReport,
}

impl<'a> MigrationLedger<'a> {
    /// Fails with `SeedError::Validation` before any store access when the
    /// list has duplicate or unordered ids
    pub fn new(store: &'a dyn DocumentStore, migrations: Vec<Migration>) -> Result<Self> {
        let validation = validate(&migrations)?;
        Ok(Self {
            store,
            migrations,
            validation,
        })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    async fn applied(&self) -> Result<HashMap<String, MigrationRecord>> {
        let documents = self
            .store
            .find(
                MIGRATION_COLLECTION,
                FindQuery::new(Filter::eq("applied", true)).sort_by("version", SortOrder::Ascending),
            )
            .await?;

        let mut applied = HashMap::with_capacity(documents.len());
        for document in documents {
            let record: MigrationRecord = bson::from_document(document)?;
            applied.insert(record.version.clone(), record);
        }
        Ok(applied)
    }

    /// Applied state of every known migration; never writes
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let applied = self.applied().await?;
        Ok(self
            .migrations
            .iter()
            .map(|m| {
                let record = applied.get(&m.id);
                MigrationStatus {
                    id: m.id.clone(),
                    description: m.description.clone(),
                    applied: record.is_some(),
                    applied_at: record.map(|r| r.applied_at),
                }
            })
            .collect())
    }

    /// Migrations `up` would apply, in order; never writes
    pub async fn pending(&self) -> Result<Vec<MigrationStatus>> {
        Ok(self.status().await?.into_iter().filter(|s| !s.applied).collect())
    }

    /// Apply every pending migration in order, stopping at the first failure
    ///
    /// Returns the ids applied by this call. Migrations applied before a
    /// failure stay applied.
    pub async fn up(&self) -> Result<Vec<String>> {
        self.store
            .create_indexes(MIGRATION_COLLECTION, MigrationRecord::into_indices())
            .await?;
        let applied = self.applied().await?;

        let mut ran = Vec::new();
        for migration in &self.migrations {
            if applied.contains_key(&migration.id) {
                info!(migration = %migration.id, "Already applied, skipping");
                continue;
            }

            info!(migration = %migration.id, description = %migration.description, "Applying migration");
            migration
                .action
                .up(self.store)
                .await
                .map_err(|e| SeedError::Migration(format!("{} failed: {}", migration.id, e)))?;
            self.record(migration).await?;
            ran.push(migration.id.clone());
        }

        info!(applied = ran.len(), "Migrations complete");
        Ok(ran)
    }

    async fn record(&self, migration: &Migration) -> Result<()> {
        let now = DateTime::now();
        let record = MigrationRecord {
            version: migration.id.clone(),
            description: migration.description.clone(),
            applied: true,
            applied_at: now,
            created_at: now,
        };
        self.store
            .insert_many(MIGRATION_COLLECTION, vec![bson::to_document(&record)?])
            .await?;
        Ok(())
    }

    /// Check that `target` can be rolled back without running it
    pub async fn rollback_target(&self, target: &str) -> Result<&Migration> {
        let migration = self
            .migrations
            .iter()
            .find(|m| m.id == target)
            .ok_or_else(|| SeedError::Migration(format!("migration {} not found", target)))?;

        if !self.applied().await?.contains_key(target) {
            return Err(SeedError::Migration(format!("migration {} is not applied", target)));
        }
        if !migration.action.reversible() {
            return Err(SeedError::Migration(format!("migration {} does not support rollback", target)));
        }
        Ok(migration)
    }

    /// Roll back exactly `target`
    pub async fn down(&self, target: &str) -> Result<()> {
        let migration = self.rollback_target(target).await?;

        info!(migration = target, "Rolling back migration");
        migration
            .action
            .down(self.store)
            .await
            .map_err(|e| SeedError::Migration(format!("{} rollback failed: {}", target, e)))?;
        self.store
            .delete_many(MIGRATION_COLLECTION, &Filter::eq("version", target))
            .await?;
        Ok(())
    }

    /// Drop every collection in the database, ledger included
    ///
    /// A collection that fails to drop is logged and skipped.
    pub async fn reset(store: &dyn DocumentStore) -> Result<usize> {
        let collections = store.list_collections().await?;
        info!(collections = collections.len(), "Dropping all collections");

        let mut dropped = 0;
        for collection in &collections {
            match store.drop_collection(collection).await {
                Ok(()) => dropped += 1,
                Err(e) => warn!(collection = %collection, "Failed to drop collection: {}", e),
            }
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::migrations::MigrationAction;
    use async_trait::async_trait;

    struct Touch(&'static str);

    #[async_trait]
    impl MigrationAction for Touch {
        async fn up(&self, store: &dyn DocumentStore) -> Result<()> {
            store.insert_many(self.0, vec![doc! { "touched": true }]).await?;
            Ok(())
        }

        async fn down(&self, store: &dyn DocumentStore) -> Result<()> {
            store.delete_many(self.0, &Filter::All).await?;
            Ok(())
        }

        fn reversible(&self) -> bool {
            true
        }
    }

    struct Broken;

    #[async_trait]
    impl MigrationAction for Broken {
        async fn up(&self, _store: &dyn DocumentStore) -> Result<()> {
            Err(SeedError::Internal("boom".to_string()))
        }
    }

    fn migrations() -> Vec<Migration> {
        vec![
            Migration::new("001_first", "first", Touch("first")),
            Migration::new("002_second", "second", Touch("second")),
        ]
    }

    #[tokio::test]
    async fn test_up_is_idempotent_and_recorded() {
        let store = MemoryStore::new();
        let ledger = MigrationLedger::new(&store, migrations()).unwrap();

        assert_eq!(ledger.up().await.unwrap(), vec!["001_first", "002_second"]);
        assert!(ledger.up().await.unwrap().is_empty());
        assert_eq!(store.count_documents("first", &Filter::All).await.unwrap(), 1);

        let status = ledger.status().await.unwrap();
        assert!(status.iter().all(|s| s.applied && s.applied_at.is_some()));
        assert!(store.index_names(MIGRATION_COLLECTION).await.contains(&"version_unique".to_string()));
    }

    #[tokio::test]
    async fn test_status_does_not_write() {
        let store = MemoryStore::new();
        let ledger = MigrationLedger::new(&store, migrations()).unwrap();
        let status = ledger.status().await.unwrap();
        assert!(status.iter().all(|s| !s.applied));
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_up_halts_on_first_failure() {
        let store = MemoryStore::new();
        let list = vec![
            Migration::new("001_first", "first", Touch("first")),
            Migration::new("002_broken", "broken", Broken),
            Migration::new("003_third", "third", Touch("third")),
        ];
        let ledger = MigrationLedger::new(&store, list).unwrap();

        let err = ledger.up().await.unwrap_err();
        assert!(matches!(err, SeedError::Migration(ref m) if m.contains("002_broken")));

        let status = ledger.status().await.unwrap();
        assert_eq!(status.iter().filter(|s| s.applied).count(), 1);
        assert_eq!(store.count_documents("third", &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_down_targets_one_migration() {
        let store = MemoryStore::new();
        let ledger = MigrationLedger::new(&store, migrations()).unwrap();
        ledger.up().await.unwrap();

        ledger.down("001_first").await.unwrap();
        let status = ledger.status().await.unwrap();
        assert!(!status[0].applied);
        assert!(status[1].applied);
        assert_eq!(store.count_documents("first", &Filter::All).await.unwrap(), 0);

        assert!(ledger.down("001_first").await.is_err());
        assert!(ledger.down("999_missing").await.is_err());
    }

    #[tokio::test]
    async fn test_previews_leave_store_untouched() {
        let store = MemoryStore::new();
        let ledger = MigrationLedger::new(&store, migrations()).unwrap();

        let pending: Vec<String> = ledger.pending().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(pending, vec!["001_first", "002_second"]);
        assert!(ledger.rollback_target("001_first").await.is_err());
        assert!(store.list_collections().await.unwrap().is_empty());

        ledger.up().await.unwrap();
        assert!(ledger.pending().await.unwrap().is_empty());
        assert_eq!(ledger.rollback_target("002_second").await.unwrap().id, "002_second");
        assert_eq!(store.count_documents("second", &Filter::All).await.unwrap(), 1);
        assert_eq!(store.count_documents(MIGRATION_COLLECTION, &Filter::All).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unordered_list_rejected_before_store_access() {
        let store = MemoryStore::new();
        let mut list = migrations();
        list.reverse();
        assert!(matches!(
            MigrationLedger::new(&store, list),
            Err(SeedError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_drops_everything() {
        let store = MemoryStore::new();
        let ledger = MigrationLedger::new(&store, migrations()).unwrap();
        ledger.up().await.unwrap();

        assert_eq!(MigrationLedger::reset(&store).await.unwrap(), 3);
        assert!(store.list_collections().await.unwrap().is_empty());
    }
}
