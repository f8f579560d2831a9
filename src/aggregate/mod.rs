//! Aggregate recomputation engine
//!
//! Denormalized counters are rebuilt from their edge collections with one
//! grouping query per counter, then written back with one `$set` per owning
//! document. Counters are overwritten, never incremented, so a recompute is
//! idempotent and can run against a live store at any time.

use std::collections::HashMap;

use bson::{oid::ObjectId, Bson, Document};
use tracing::{debug, info, warn};

use crate::db::schemas::{
    LikeTarget, COMMENT_COLLECTION, CONVERSATION_COLLECTION, EVENT_COLLECTION,
    EVENT_RSVP_COLLECTION, FOLLOW_COLLECTION, GROUP_COLLECTION, GROUP_MEMBER_COLLECTION,
    LIKE_COLLECTION, MESSAGE_COLLECTION, POST_COLLECTION, STORY_COLLECTION,
    STORY_VIEW_COLLECTION, USER_COLLECTION,
};
use crate::db::{DocumentStore, Filter, FindQuery, GroupCount, GroupRow};
use crate::types::Result;

// ============================================================================
// Counter specifications
// ============================================================================

/// How grouped rows turn into counter fields
#[derive(Debug, Clone)]
pub enum Reduction {
    /// Row count per key into a single field
    Count { field: &'static str },
    /// Row count per (key, status) into one field per status value
    CountByStatus {
        status_field: &'static str,
        fields: Vec<(&'static str, &'static str)>,
    },
}

impl Reduction {
    fn counter_fields(&self) -> Vec<&'static str> {
        match self {
            Self::Count { field } => vec![*field],
            Self::CountByStatus { fields, .. } => fields.iter().map(|(_, field)| *field).collect(),
        }
    }
}

/// One denormalized counter and where it is derived from
#[derive(Debug, Clone)]
pub struct CounterSpec {
    pub name: &'static str,
    /// Collection holding the counter fields
    pub owner: &'static str,
    /// Edge collection that is grouped
    pub source: &'static str,
    pub filter: Filter,
    /// Field in `source` referencing the owner's `_id`
    pub group_key: &'static str,
    pub reduction: Reduction,
}

impl CounterSpec {
    pub fn count(
        name: &'static str,
        owner: &'static str,
        source: &'static str,
        group_key: &'static str,
        field: &'static str,
    ) -> Self {
        Self {
            name,
            owner,
            source,
            filter: Filter::All,
            group_key,
            reduction: Reduction::Count { field },
        }
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    fn query(&self) -> GroupCount {
        let query = GroupCount::by(self.group_key).matching(self.filter.clone());
        match &self.reduction {
            Reduction::Count { .. } => query,
            Reduction::CountByStatus { status_field, .. } => query.partitioned_by(*status_field),
        }
    }
}

/// Every counter maintained on generated documents
pub fn default_counters() -> Vec<CounterSpec> {
    let accepted = || Filter::eq("status", "accepted");
    let like_of = |target: LikeTarget| Filter::eq("target_type", target.as_str());

    vec![
        CounterSpec::count("user_followers", USER_COLLECTION, FOLLOW_COLLECTION, "followee_id", "followers_count")
            .matching(accepted()),
        CounterSpec::count("user_following", USER_COLLECTION, FOLLOW_COLLECTION, "follower_id", "following_count")
            .matching(accepted()),
        CounterSpec::count("user_posts", USER_COLLECTION, POST_COLLECTION, "user_id", "posts_count"),
        CounterSpec::count("post_likes", POST_COLLECTION, LIKE_COLLECTION, "target_id", "likes_count")
            .matching(like_of(LikeTarget::Post)),
        CounterSpec::count("post_comments", POST_COLLECTION, COMMENT_COLLECTION, "post_id", "comments_count"),
        CounterSpec::count("post_shares", POST_COLLECTION, POST_COLLECTION, "original_post_id", "shares_count")
            .matching(Filter::exists("original_post_id", true)),
        CounterSpec::count("comment_likes", COMMENT_COLLECTION, LIKE_COLLECTION, "target_id", "likes_count")
            .matching(like_of(LikeTarget::Comment)),
        CounterSpec::count("comment_replies", COMMENT_COLLECTION, COMMENT_COLLECTION, "parent_id", "replies_count")
            .matching(Filter::eq("level", 1)),
        CounterSpec::count("story_views", STORY_COLLECTION, STORY_VIEW_COLLECTION, "story_id", "views_count"),
        CounterSpec::count("story_likes", STORY_COLLECTION, LIKE_COLLECTION, "target_id", "likes_count")
            .matching(like_of(LikeTarget::Story)),
        CounterSpec::count("group_members", GROUP_COLLECTION, GROUP_MEMBER_COLLECTION, "group_id", "members_count")
            .matching(Filter::eq("status", "active")),
        CounterSpec {
            name: "event_rsvps",
            owner: EVENT_COLLECTION,
            source: EVENT_RSVP_COLLECTION,
            filter: Filter::All,
            group_key: "event_id",
            reduction: Reduction::CountByStatus {
                status_field: "status",
                fields: vec![
                    ("going", "going_count"),
                    ("maybe", "maybe_count"),
                    ("not_going", "not_going_count"),
                ],
            },
        },
        CounterSpec::count(
            "conversation_messages",
            CONVERSATION_COLLECTION,
            MESSAGE_COLLECTION,
            "conversation_id",
            "messages_count",
        ),
    ]
}

// ============================================================================
// Recompute
// ============================================================================

/// Grouped counts keyed by owner id, one map per counter field
fn tally(spec: &CounterSpec, rows: Vec<GroupRow>) -> HashMap<&'static str, HashMap<ObjectId, i64>> {
    let mut tallies: HashMap<&'static str, HashMap<ObjectId, i64>> = HashMap::new();
    for row in rows {
        let Bson::ObjectId(owner) = row.key else {
            continue;
        };
        let field = match (&spec.reduction, row.partition) {
            (Reduction::Count { field }, _) => Some(*field),
            (Reduction::CountByStatus { fields, .. }, Some(Bson::String(status))) => fields
                .iter()
                .find(|(value, _)| *value == status)
                .map(|(_, field)| *field),
            _ => None,
        };
        if let Some(field) = field {
            *tallies.entry(field).or_default().entry(owner).or_default() += row.count;
        }
    }
    tallies
}

/// Recompute one counter, returning how many owner documents were updated
pub async fn recompute(store: &dyn DocumentStore, spec: &CounterSpec) -> Result<u64> {
    let rows = store.group_count(spec.source, &spec.query()).await?;
    let tallies = tally(spec, rows);
    let fields = spec.reduction.counter_fields();

    let owners = store
        .find(spec.owner, FindQuery::all().project(["_id"]))
        .await?;

    let mut applied = 0;
    for owner in owners {
        let Ok(id) = owner.get_object_id("_id") else {
            continue;
        };
        let mut set = Document::new();
        for field in &fields {
            let value = tallies
                .get(field)
                .and_then(|counts| counts.get(&id))
                .copied()
                .unwrap_or(0);
            set.insert(*field, Bson::Int64(value));
        }
        applied += store.update_one(spec.owner, &Filter::eq("_id", id), set).await?;
    }

    debug!(counter = spec.name, owner = spec.owner, applied, "Counter recomputed");
    Ok(applied)
}

/// Outcome of recomputing a set of counters
#[derive(Debug, Default)]
pub struct RecomputeReport {
    pub applied: Vec<(&'static str, u64)>,
    pub failed: Vec<(&'static str, String)>,
}

impl RecomputeReport {
    pub fn total_updated(&self) -> u64 {
        self.applied.iter().map(|(_, n)| n).sum()
    }
}

/// Recompute every counter; counters are independent so failures are
/// logged and the rest still run
pub async fn recompute_all(store: &dyn DocumentStore, specs: &[CounterSpec]) -> Result<RecomputeReport> {
    let mut report = RecomputeReport::default();
    for spec in specs {
        match recompute(store, spec).await {
            Ok(applied) => report.applied.push((spec.name, applied)),
            Err(e) => {
                warn!(counter = spec.name, "Counter recompute failed: {}", e);
                report.failed.push((spec.name, e.to_string()));
            }
        }
    }
    info!(
        counters = report.applied.len(),
        failed = report.failed.len(),
        updated = report.total_updated(),
        "Aggregate recompute finished"
    );
    Ok(report)
}
