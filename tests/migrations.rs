//! Migration registry validation and ledger lifecycle through the public API

use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};

use graphseed::auth::HashCost;
use graphseed::db::schemas::{MIGRATION_COLLECTION, USER_COLLECTION};
use graphseed::db::{DocumentStore, Filter, MemoryStore};
use graphseed::migrations::{builtin_migrations, validate, Migration, MigrationAction, MigrationLedger};
use graphseed::{Result, SeedError};

struct Noop;

#[async_trait]
impl MigrationAction for Noop {
    async fn up(&self, _store: &dyn DocumentStore) -> Result<()> {
        Ok(())
    }
}

fn registry(ids: &[&str]) -> Vec<Migration> {
    ids.iter().map(|id| Migration::new(*id, "noop", Noop)).collect()
}

#[test]
fn builtin_registry_is_valid() {
    let report = assert_ok!(validate(&builtin_migrations(HashCost::Light)));
    assert_eq!(report.total, 3);
}

#[test]
fn registry_with_shared_identifier_is_rejected() {
    let err = validate(&registry(&["001_a", "001_a"])).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn registry_out_of_order_is_rejected() {
    let err = assert_err!(validate(&registry(&["001_a", "003_c", "002_b"])));
    assert!(matches!(err, SeedError::Validation(_)));
}

#[tokio::test]
async fn invalid_registry_never_touches_the_store() {
    let store = MemoryStore::new();
    assert!(MigrationLedger::new(&store, registry(&["002_b", "001_a"])).is_err());
    assert!(store.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn builtin_lifecycle_up_down_up() {
    let store = MemoryStore::new();
    let ledger = MigrationLedger::new(&store, builtin_migrations(HashCost::Light)).unwrap();

    assert_eq!(ledger.up().await.unwrap().len(), 3);
    assert_eq!(store.count_documents(MIGRATION_COLLECTION, &Filter::All).await.unwrap(), 3);

    ledger.down("003_create_admin_user").await.unwrap();
    assert_eq!(store.count_documents(USER_COLLECTION, &Filter::All).await.unwrap(), 0);

    let pending: Vec<String> = ledger
        .status()
        .await
        .unwrap()
        .into_iter()
        .filter(|s| !s.applied)
        .map(|s| s.id)
        .collect();
    assert_eq!(pending, vec!["003_create_admin_user".to_string()]);

    assert_eq!(ledger.up().await.unwrap(), vec!["003_create_admin_user".to_string()]);
    assert_eq!(store.count_documents(USER_COLLECTION, &Filter::All).await.unwrap(), 1);
}
