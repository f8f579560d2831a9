//! Versioned data migrations
//!
//! Migrations are identified by strings that sort chronologically. The list
//! is validated before anything runs: duplicate or out-of-order identifiers
//! are a startup failure. Applied state lives in the `migrations` collection.

mod builtin;
mod ledger;
mod scaffold;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;

use crate::db::DocumentStore;
use crate::types::{Result, SeedError};

pub use builtin::builtin_migrations;
pub use ledger::{MigrationLedger, MigrationRecord, MigrationStatus};
pub use scaffold::create_scaffold;

/// Work performed by one migration
#[async_trait]
pub trait MigrationAction: Send + Sync {
    async fn up(&self, store: &dyn DocumentStore) -> Result<()>;

    async fn down(&self, _store: &dyn DocumentStore) -> Result<()> {
        Err(SeedError::Migration("migration is not reversible".to_string()))
    }

    /// Whether `down` is implemented
    fn reversible(&self) -> bool {
        false
    }
}

pub struct Migration {
    pub id: String,
    pub description: String,
    pub action: Box<dyn MigrationAction>,
}

impl Migration {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        action: impl MigrationAction + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            action: Box::new(action),
        }
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("reversible", &self.action.reversible())
            .finish()
    }
}

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub total: usize,
    /// Migrations that cannot be rolled back; a warning, not an error
    pub irreversible: Vec<String>,
}

/// Check a migration list without touching any store
pub fn validate(migrations: &[Migration]) -> Result<ValidationReport> {
    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = migrations
        .iter()
        .filter(|m| !seen.insert(m.id.as_str()))
        .map(|m| m.id.as_str())
        .collect();
    if !duplicates.is_empty() {
        return Err(SeedError::Validation(format!(
            "duplicate migration ids: {}",
            duplicates.join(", ")
        )));
    }

    if let Some(pair) = migrations.windows(2).find(|pair| pair[0].id > pair[1].id) {
        return Err(SeedError::Validation(format!(
            "migrations are not in chronological order: {} should come before {}",
            pair[1].id, pair[0].id
        )));
    }

    let irreversible: Vec<String> = migrations
        .iter()
        .filter(|m| !m.action.reversible())
        .map(|m| m.id.clone())
        .collect();
    if !irreversible.is_empty() {
        warn!(migrations = ?irreversible, "Migrations without rollback");
    }

    Ok(ValidationReport {
        total: migrations.len(),
        irreversible,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl MigrationAction for Noop {
        async fn up(&self, _store: &dyn DocumentStore) -> Result<()> {
            Ok(())
        }
    }

    fn list(ids: &[&str]) -> Vec<Migration> {
        ids.iter().map(|id| Migration::new(*id, "test", Noop)).collect()
    }

    #[test]
    fn test_accepts_ordered_unique_ids() {
        let report = validate(&list(&["001_a", "002_b", "20240101000000_c"])).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.irreversible.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = validate(&list(&["001_a", "002_b", "001_a"])).unwrap_err();
        assert!(matches!(err, SeedError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn test_rejects_unordered_ids() {
        let err = validate(&list(&["002_b", "001_a"])).unwrap_err();
        assert!(matches!(err, SeedError::Validation(ref m) if m.contains("chronological")));
    }

    #[test]
    fn test_builtins_are_valid() {
        let migrations = builtin_migrations(crate::auth::HashCost::Light);
        let report = validate(&migrations).unwrap();
        assert_eq!(report.total, 3);
        assert!(report.irreversible.is_empty());
    }
}
