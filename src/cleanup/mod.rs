//! Maintenance operations for a live store
//!
//! Age-based pruning per category, inactive-account removal, orphan pruning,
//! counter repair, index reset and collection statistics. Every destructive
//! operation honours `dry_run`, in which case matching documents are only
//! counted.

use std::fmt;
use std::time::Instant;

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{default_counters, recompute_all};
use crate::db::schemas::{
    ANALYTICS_COLLECTION, COMMENT_COLLECTION, CONVERSATION_COLLECTION, EVENT_COLLECTION,
    FOLLOW_COLLECTION, GROUP_COLLECTION, HASHTAG_COLLECTION, LIKE_COLLECTION, MESSAGE_COLLECTION,
    NOTIFICATION_COLLECTION, POST_COLLECTION, SESSION_COLLECTION, STORY_COLLECTION,
    USER_COLLECTION,
};
use crate::db::{DocumentStore, Filter, FindQuery};
use crate::orphans::{default_rules, prune_all};
use crate::types::{Result, SeedError};

/// Collections whose indexes are dropped by `optimize`
pub const OPTIMIZED_COLLECTIONS: &[&str] = &[
    USER_COLLECTION,
    POST_COLLECTION,
    COMMENT_COLLECTION,
    STORY_COLLECTION,
    MESSAGE_COLLECTION,
    CONVERSATION_COLLECTION,
    FOLLOW_COLLECTION,
    LIKE_COLLECTION,
    NOTIFICATION_COLLECTION,
    GROUP_COLLECTION,
    EVENT_COLLECTION,
    HASHTAG_COLLECTION,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CleanupOp {
    All,
    Stories,
    Sessions,
    Notifications,
    Analytics,
    Messages,
    Users,
    Orphans,
    Counters,
    Optimize,
    Stats,
}

impl CleanupOp {
    /// Categories run by `all`, in order
    pub const ALL: [CleanupOp; 9] = [
        Self::Stories,
        Self::Sessions,
        Self::Notifications,
        Self::Analytics,
        Self::Messages,
        Self::Users,
        Self::Orphans,
        Self::Counters,
        Self::Optimize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Stories => "stories",
            Self::Sessions => "sessions",
            Self::Notifications => "notifications",
            Self::Analytics => "analytics",
            Self::Messages => "messages",
            Self::Users => "users",
            Self::Orphans => "orphans",
            Self::Counters => "counters",
            Self::Optimize => "optimize",
            Self::Stats => "stats",
        }
    }

    /// Whether the operation deletes or rewrites data
    pub fn is_destructive(self) -> bool {
        !matches!(self, Self::Stats)
    }
}

impl fmt::Display for CleanupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Age thresholds per category
#[derive(Debug, Clone, Copy)]
pub struct CleanupAges {
    pub stories: Duration,
    pub sessions: Duration,
    pub notifications: Duration,
    pub analytics: Duration,
    /// Grace period after a disappearing message expires
    pub messages: Duration,
    pub inactive_users: Duration,
}

impl Default for CleanupAges {
    fn default() -> Self {
        Self {
            stories: Duration::hours(24),
            sessions: Duration::days(30),
            notifications: Duration::days(90),
            analytics: Duration::days(365),
            messages: Duration::zero(),
            inactive_users: Duration::days(730),
        }
    }
}

/// Per-category counts collected over one invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupStats {
    pub dry_run: bool,
    pub expired_stories: u64,
    pub expired_sessions: u64,
    pub expired_notifications: u64,
    pub expired_analytics: u64,
    pub expired_messages: u64,
    pub inactive_users: u64,
    pub orphaned: u64,
    pub counters_updated: u64,
    pub optimized_collections: u64,
    pub collection_counts: Vec<(String, u64)>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u128,
}

impl fmt::Display for CleanupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would remove" } else { "removed" };
        writeln!(f, "=== CLEANUP SUMMARY ({}) ===", if self.dry_run { "dry run" } else { "applied" })?;
        writeln!(f, "Expired stories       {} {}", verb, self.expired_stories)?;
        writeln!(f, "Expired sessions      {} {}", verb, self.expired_sessions)?;
        writeln!(f, "Expired notifications {} {}", verb, self.expired_notifications)?;
        writeln!(f, "Expired analytics     {} {}", verb, self.expired_analytics)?;
        writeln!(f, "Expired messages      {} {}", verb, self.expired_messages)?;
        writeln!(f, "Inactive users        {} {}", verb, self.inactive_users)?;
        writeln!(f, "Orphaned documents    {} {}", verb, self.orphaned)?;
        writeln!(f, "Counters updated      {}", self.counters_updated)?;
        writeln!(f, "Optimized collections {}", self.optimized_collections)?;
        for (collection, count) in &self.collection_counts {
            writeln!(f, "  {:<20} {:>10} documents", collection, count)?;
        }
        for warning in &self.warnings {
            writeln!(f, "Warning: {}", warning)?;
        }
        write!(f, "Total duration        {:.2}s", self.elapsed_ms as f64 / 1000.0)
    }
}

fn before(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(at)
}

/// Runs cleanup operations against one store
pub struct Cleaner<'a> {
    store: &'a dyn DocumentStore,
    ages: CleanupAges,
    dry_run: bool,
    now: DateTime<Utc>,
    stats: CleanupStats,
}

impl<'a> Cleaner<'a> {
    pub fn new(store: &'a dyn DocumentStore, ages: CleanupAges, dry_run: bool) -> Self {
        Self {
            store,
            ages,
            dry_run,
            now: Utc::now(),
            stats: CleanupStats {
                dry_run,
                ..CleanupStats::default()
            },
        }
    }

    pub fn stats(&self) -> &CleanupStats {
        &self.stats
    }

    pub fn into_stats(self) -> CleanupStats {
        self.stats
    }

    /// Run one operation, or every category for `All`
    ///
    /// A single operation propagates its error. `All` logs a failed category,
    /// records a warning and carries on with the rest.
    pub async fn run(&mut self, op: CleanupOp) -> Result<()> {
        let started = Instant::now();
        let result = if op == CleanupOp::All {
            for category in CleanupOp::ALL {
                info!(operation = %category, "Running cleanup category");
                if let Err(e) = self.run_one(category).await {
                    warn!(operation = %category, "Cleanup category failed: {}", e);
                    self.stats.warnings.push(format!("{}: {}", category, e));
                }
            }
            Ok(())
        } else {
            self.run_one(op).await
        };
        self.stats.elapsed_ms += started.elapsed().as_millis();
        result
    }

    async fn run_one(&mut self, op: CleanupOp) -> Result<()> {
        match op {
            CleanupOp::All => Err(SeedError::Internal("`all` is not a single category".to_string())),
            CleanupOp::Stories => {
                self.stats.expired_stories = self.expired_stories().await?;
                Ok(())
            }
            CleanupOp::Sessions => {
                self.stats.expired_sessions = self.expired_sessions().await?;
                Ok(())
            }
            CleanupOp::Notifications => {
                self.stats.expired_notifications = self.expired_notifications().await?;
                Ok(())
            }
            CleanupOp::Analytics => {
                self.stats.expired_analytics = self.expired_analytics().await?;
                Ok(())
            }
            CleanupOp::Messages => {
                self.stats.expired_messages = self.expired_messages().await?;
                Ok(())
            }
            CleanupOp::Users => {
                self.stats.inactive_users = self.inactive_users().await?;
                Ok(())
            }
            CleanupOp::Orphans => {
                self.stats.orphaned = self.orphans().await;
                Ok(())
            }
            CleanupOp::Counters => {
                self.stats.counters_updated = self.counters().await?;
                Ok(())
            }
            CleanupOp::Optimize => {
                self.stats.optimized_collections = self.optimize().await;
                Ok(())
            }
            CleanupOp::Stats => {
                self.stats.collection_counts = self.collection_counts().await?;
                Ok(())
            }
        }
    }

    /// Delete matches, or count them when running dry
    async fn remove(&self, collection: &str, filter: Filter) -> Result<u64> {
        let affected = if self.dry_run {
            self.store.count_documents(collection, &filter).await?
        } else {
            self.store.delete_many(collection, &filter).await?
        };
        info!(collection, affected, dry_run = self.dry_run, "Cleanup pass complete");
        Ok(affected)
    }

    /// Expired stories that are not part of a highlight
    pub async fn expired_stories(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.stories);
        let filter = Filter::and(vec![
            Filter::or(vec![Filter::eq("is_expired", true), Filter::lt("expires_at", cutoff)]),
            Filter::ne("is_highlighted", true),
        ]);
        self.remove(STORY_COLLECTION, filter).await
    }

    pub async fn expired_sessions(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.sessions);
        let filter = Filter::or(vec![
            Filter::lt("expires_at", before(self.now)),
            Filter::lt("last_activity", cutoff),
            Filter::eq("is_active", false),
        ]);
        self.remove(SESSION_COLLECTION, filter).await
    }

    /// Read notifications past their expiry or older than the threshold
    pub async fn expired_notifications(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.notifications);
        let filter = Filter::and(vec![
            Filter::eq("is_read", true),
            Filter::or(vec![
                Filter::lt("expires_at", before(self.now)),
                Filter::lt("created_at", cutoff),
            ]),
        ]);
        self.remove(NOTIFICATION_COLLECTION, filter).await
    }

    pub async fn expired_analytics(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.analytics);
        self.remove(ANALYTICS_COLLECTION, Filter::lt("created_at", cutoff)).await
    }

    /// Disappearing messages past expiry plus the grace period
    pub async fn expired_messages(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.messages);
        let filter = Filter::and(vec![Filter::eq("is_expired", true), Filter::lt("expires_at", cutoff)]);
        self.remove(MESSAGE_COLLECTION, filter).await
    }

    /// Inactive accounts with no activity, removed after their related data
    pub async fn inactive_users(&self) -> Result<u64> {
        let cutoff = before(self.now - self.ages.inactive_users);
        let filter = Filter::and(vec![
            Filter::eq("is_active", false),
            Filter::lt("last_active_at", cutoff),
            Filter::eq("posts_count", 0),
            Filter::eq("followers_count", 0),
            Filter::eq("following_count", 0),
        ]);

        if self.dry_run {
            return self.remove(USER_COLLECTION, filter).await;
        }

        let ids: Vec<ObjectId> = self
            .store
            .find(USER_COLLECTION, FindQuery::new(filter).project(["_id"]))
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();
        if ids.is_empty() {
            info!("No inactive users to delete");
            return Ok(0);
        }

        self.remove_related(&ids).await;
        self.remove(USER_COLLECTION, Filter::ids(&ids)).await
    }

    /// Best effort: a failing collection is logged and skipped
    async fn remove_related(&self, ids: &[ObjectId]) {
        let either = |a: &str, b: &str| {
            Filter::or(vec![
                Filter::is_in(a, ids.iter().copied()),
                Filter::is_in(b, ids.iter().copied()),
            ])
        };
        let by_user = || Filter::is_in("user_id", ids.iter().copied());
        let related = [
            (POST_COLLECTION, by_user()),
            (COMMENT_COLLECTION, by_user()),
            (STORY_COLLECTION, by_user()),
            (LIKE_COLLECTION, by_user()),
            (FOLLOW_COLLECTION, either("follower_id", "followee_id")),
            (NOTIFICATION_COLLECTION, either("recipient_id", "actor_id")),
        ];

        for (collection, filter) in related {
            if let Err(e) = self.store.delete_many(collection, &filter).await {
                warn!(collection, "Failed to remove related data: {}", e);
            }
        }
    }

    async fn orphans(&self) -> u64 {
        prune_all(self.store, &default_rules(), self.dry_run)
            .await
            .iter()
            .map(|o| if o.dry_run { o.found as u64 } else { o.deleted })
            .sum()
    }

    async fn counters(&self) -> Result<u64> {
        let counters = default_counters();
        if self.dry_run {
            info!(counters = counters.len(), "DRY RUN: would recompute counters");
            return Ok(0);
        }
        let report = recompute_all(self.store, &counters).await?;
        Ok(report.total_updated())
    }

    /// Drop secondary indexes; migrations recreate them
    async fn optimize(&self) -> u64 {
        let mut optimized = 0;
        for collection in OPTIMIZED_COLLECTIONS {
            if self.dry_run {
                info!(collection, "DRY RUN: would drop indexes");
                optimized += 1;
                continue;
            }
            match self.store.drop_indexes(collection).await {
                Ok(()) => optimized += 1,
                Err(e) => warn!(collection, "Failed to optimize collection: {}", e),
            }
        }
        optimized
    }

    pub async fn collection_counts(&self) -> Result<Vec<(String, u64)>> {
        let mut names = self.store.list_collections().await?;
        names.sort();
        let mut counts = Vec::with_capacity(names.len());
        for name in names {
            let count = self.store.count_documents(&name, &Filter::All).await?;
            counts.push((name, count));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{IndexSpec, MemoryStore};
    use bson::doc;

    fn ago(hours: i64) -> bson::DateTime {
        bson::DateTime::from_chrono(Utc::now() - Duration::hours(hours))
    }

    async fn store_with_stories() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_many(
                STORY_COLLECTION,
                vec![
                    doc! { "is_expired": true, "is_highlighted": false, "expires_at": ago(1) },
                    doc! { "is_expired": true, "is_highlighted": true, "expires_at": ago(1) },
                    doc! { "is_expired": false, "is_highlighted": false, "expires_at": ago(-5) },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_deleting() {
        let store = store_with_stories().await;
        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), true);

        cleaner.run(CleanupOp::Stories).await.unwrap();
        assert_eq!(cleaner.stats().expired_stories, 1);
        assert_eq!(store.count_documents(STORY_COLLECTION, &Filter::All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_highlighted_stories_survive() {
        let store = store_with_stories().await;
        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), false);

        cleaner.run(CleanupOp::Stories).await.unwrap();
        assert_eq!(cleaner.stats().expired_stories, 1);
        let left = store.dump(STORY_COLLECTION).await;
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|d| !d.get_bool("is_expired").unwrap() || d.get_bool("is_highlighted").unwrap()));
    }

    #[tokio::test]
    async fn test_only_read_notifications_expire() {
        let store = MemoryStore::new();
        store
            .insert_many(
                NOTIFICATION_COLLECTION,
                vec![
                    doc! { "is_read": true, "created_at": ago(24 * 100) },
                    doc! { "is_read": false, "created_at": ago(24 * 100) },
                    doc! { "is_read": true, "created_at": ago(1) },
                ],
            )
            .await
            .unwrap();

        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), false);
        cleaner.run(CleanupOp::Notifications).await.unwrap();
        assert_eq!(cleaner.stats().expired_notifications, 1);
    }

    #[tokio::test]
    async fn test_inactive_users_take_related_data_with_them() {
        let store = MemoryStore::new();
        let gone = ObjectId::new();
        let kept = ObjectId::new();
        store
            .insert_many(
                USER_COLLECTION,
                vec![
                    doc! {
                        "_id": gone, "is_active": false, "last_active_at": ago(24 * 800),
                        "posts_count": 0_i64, "followers_count": 0_i64, "following_count": 0_i64,
                    },
                    doc! {
                        "_id": kept, "is_active": true, "last_active_at": ago(1),
                        "posts_count": 0_i64, "followers_count": 0_i64, "following_count": 0_i64,
                    },
                ],
            )
            .await
            .unwrap();
        store
            .insert_many(
                FOLLOW_COLLECTION,
                vec![
                    doc! { "follower_id": kept, "followee_id": gone },
                    doc! { "follower_id": kept, "followee_id": kept },
                ],
            )
            .await
            .unwrap();

        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), false);
        cleaner.run(CleanupOp::Users).await.unwrap();
        assert_eq!(cleaner.stats().inactive_users, 1);
        assert_eq!(store.count_documents(FOLLOW_COLLECTION, &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_all_runs_every_category() {
        let store = store_with_stories().await;
        store
            .create_indexes(POST_COLLECTION, vec![IndexSpec::new(doc! { "user_id": 1 }, "user_id_index")])
            .await
            .unwrap();

        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), false);
        cleaner.run(CleanupOp::All).await.unwrap();
        let stats = cleaner.into_stats();
        assert_eq!(stats.expired_stories, 1);
        assert_eq!(stats.optimized_collections, OPTIMIZED_COLLECTIONS.len() as u64);
        assert!(stats.warnings.is_empty());
        assert!(store.index_names(POST_COLLECTION).await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_lists_collections() {
        let store = store_with_stories().await;
        let mut cleaner = Cleaner::new(&store, CleanupAges::default(), true);
        cleaner.run(CleanupOp::Stats).await.unwrap();
        assert_eq!(cleaner.stats().collection_counts, vec![(STORY_COLLECTION.to_string(), 3)]);
    }
}
