//! graphseed - synthetic social graph generation for MongoDB
//!
//! Populates a document store with an internally consistent social graph and
//! keeps it consistent afterwards.
//!
//! ## Components
//!
//! - **Seed**: dependency-ordered generation stages over a constrained sampler
//! - **Aggregate**: denormalized counter recomputation
//! - **Orphans**: dangling reference detection and pruning
//! - **Cleanup**: age-based pruning and store maintenance
//! - **Migrations**: versioned, validated schema migrations

pub mod aggregate;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod logging;
pub mod migrations;
pub mod orphans;
pub mod seed;
pub mod types;

pub use config::{CleanupArgs, GenerateArgs, MigrateArgs, StoreArgs};
pub use db::{DocumentStore, MemoryStore, MongoStore};
pub use seed::{Scheduler, SeedConfig};
pub use types::{Result, SeedError};

use std::future::Future;
use std::time::Duration;

/// Run an operation under the overall deadline
pub async fn with_deadline<T, F>(timeout: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| SeedError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expiry_is_a_timeout_error() {
        let result: Result<()> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(SeedError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let value = with_deadline(Duration::from_secs(1), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
