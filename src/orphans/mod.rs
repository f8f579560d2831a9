//! Orphan detection and pruning
//!
//! An orphan is a document whose foreign key no longer resolves. Detection is
//! a left anti-join per rule; pruning deletes the detected ids unless running
//! dry.

use bson::oid::ObjectId;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::schemas::{
    LikeTarget, NotificationTarget, ReportTarget, COMMENT_COLLECTION, CONVERSATION_COLLECTION,
    EVENT_COLLECTION, EVENT_RSVP_COLLECTION, FOLLOW_COLLECTION, GROUP_COLLECTION,
    GROUP_MEMBER_COLLECTION, LIKE_COLLECTION, MEDIA_COLLECTION, MENTION_COLLECTION,
    MESSAGE_COLLECTION, NOTIFICATION_COLLECTION, POST_COLLECTION, REPORT_COLLECTION,
    STORY_COLLECTION, STORY_HIGHLIGHT_COLLECTION, STORY_VIEW_COLLECTION, USER_COLLECTION,
};
use crate::db::{AntiJoin, DocumentStore, Filter, ForeignKey};
use crate::types::Result;

/// Foreign keys of one collection, optionally restricted to a subset of documents
#[derive(Debug, Clone)]
pub struct OrphanRule {
    pub name: String,
    pub collection: &'static str,
    pub filter: Filter,
    pub keys: Vec<ForeignKey>,
}

impl OrphanRule {
    pub fn new(name: impl Into<String>, collection: &'static str, keys: Vec<ForeignKey>) -> Self {
        Self {
            name: name.into(),
            collection,
            filter: Filter::All,
            keys,
        }
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    fn join(&self) -> AntiJoin {
        AntiJoin {
            filter: self.filter.clone(),
            keys: self.keys.clone(),
        }
    }
}

/// Result of running one rule
#[derive(Debug, Clone, Serialize)]
pub struct PruneOutcome {
    pub rule: String,
    pub collection: &'static str,
    pub found: usize,
    pub deleted: u64,
    pub dry_run: bool,
}

/// Rules covering every reference written by the generator outside `users`
///
/// Optional keys are only checked on documents that carry them. Polymorphic
/// targets get one rule per target type. Accounts are never pruned, so
/// `users.blocked_users` has no rule.
pub fn default_rules() -> Vec<OrphanRule> {
    let mut rules = vec![
        OrphanRule::new("media->users", MEDIA_COLLECTION, vec![ForeignKey::new("user_id", USER_COLLECTION)]),
        OrphanRule::new(
            "posts->users,media",
            POST_COLLECTION,
            vec![
                ForeignKey::new("user_id", USER_COLLECTION),
                ForeignKey::new("media_ids", MEDIA_COLLECTION),
            ],
        ),
        OrphanRule::new(
            "shares->posts",
            POST_COLLECTION,
            vec![ForeignKey::new("original_post_id", POST_COLLECTION)],
        )
        .matching(Filter::exists("original_post_id", true)),
        OrphanRule::new("stories->users", STORY_COLLECTION, vec![ForeignKey::new("user_id", USER_COLLECTION)]),
        OrphanRule::new("stories->media", STORY_COLLECTION, vec![ForeignKey::new("media_id", MEDIA_COLLECTION)])
            .matching(Filter::exists("media_id", true)),
        OrphanRule::new("comments->posts", COMMENT_COLLECTION, vec![ForeignKey::new("post_id", POST_COLLECTION)]),
        OrphanRule::new("comments->users", COMMENT_COLLECTION, vec![ForeignKey::new("user_id", USER_COLLECTION)]),
        OrphanRule::new(
            "replies->comments",
            COMMENT_COLLECTION,
            vec![ForeignKey::new("parent_id", COMMENT_COLLECTION)],
        )
        .matching(Filter::exists("parent_id", true)),
        OrphanRule::new("likes->users", LIKE_COLLECTION, vec![ForeignKey::new("user_id", USER_COLLECTION)]),
        OrphanRule::new(
            "mentions->posts,users",
            MENTION_COLLECTION,
            vec![
                ForeignKey::new("post_id", POST_COLLECTION),
                ForeignKey::new("mentioner_id", USER_COLLECTION),
                ForeignKey::new("mentioned_user_id", USER_COLLECTION),
            ],
        ),
        OrphanRule::new(
            "notifications->users",
            NOTIFICATION_COLLECTION,
            vec![
                ForeignKey::new("recipient_id", USER_COLLECTION),
                ForeignKey::new("actor_id", USER_COLLECTION),
            ],
        ),
        OrphanRule::new("reports->users", REPORT_COLLECTION, vec![ForeignKey::new("reporter_id", USER_COLLECTION)]),
        OrphanRule::new(
            "follows->users",
            FOLLOW_COLLECTION,
            vec![
                ForeignKey::new("follower_id", USER_COLLECTION),
                ForeignKey::new("followee_id", USER_COLLECTION),
            ],
        ),
        OrphanRule::new("groups->users", GROUP_COLLECTION, vec![ForeignKey::new("creator_id", USER_COLLECTION)]),
        OrphanRule::new("events->users", EVENT_COLLECTION, vec![ForeignKey::new("organizer_id", USER_COLLECTION)]),
        OrphanRule::new("events->groups", EVENT_COLLECTION, vec![ForeignKey::new("group_id", GROUP_COLLECTION)])
            .matching(Filter::exists("group_id", true)),
        OrphanRule::new(
            "group_members->groups,users",
            GROUP_MEMBER_COLLECTION,
            vec![
                ForeignKey::new("group_id", GROUP_COLLECTION),
                ForeignKey::new("user_id", USER_COLLECTION),
            ],
        ),
        OrphanRule::new(
            "event_rsvps->events,users",
            EVENT_RSVP_COLLECTION,
            vec![
                ForeignKey::new("event_id", EVENT_COLLECTION),
                ForeignKey::new("user_id", USER_COLLECTION),
            ],
        ),
        OrphanRule::new(
            "conversations->users",
            CONVERSATION_COLLECTION,
            vec![ForeignKey::new("participants", USER_COLLECTION)],
        ),
        OrphanRule::new(
            "messages->conversations",
            MESSAGE_COLLECTION,
            vec![ForeignKey::new("conversation_id", CONVERSATION_COLLECTION)],
        ),
        OrphanRule::new("messages->users", MESSAGE_COLLECTION, vec![ForeignKey::new("sender_id", USER_COLLECTION)]),
        OrphanRule::new(
            "story_views->stories",
            STORY_VIEW_COLLECTION,
            vec![ForeignKey::new("story_id", STORY_COLLECTION)],
        ),
        OrphanRule::new(
            "story_views->users",
            STORY_VIEW_COLLECTION,
            vec![ForeignKey::new("viewer_id", USER_COLLECTION)],
        ),
        OrphanRule::new(
            "story_highlights->users,stories",
            STORY_HIGHLIGHT_COLLECTION,
            vec![
                ForeignKey::new("user_id", USER_COLLECTION),
                ForeignKey::new("story_ids", STORY_COLLECTION),
            ],
        ),
    ];

    for target in LikeTarget::ALL {
        rules.push(
            OrphanRule::new(
                format!("likes->{}", target.collection()),
                LIKE_COLLECTION,
                vec![ForeignKey::new("target_id", target.collection())],
            )
            .matching(Filter::eq("target_type", target.as_str())),
        );
    }

    for target in NotificationTarget::ALL {
        let Some(collection) = target.collection() else {
            continue;
        };
        rules.push(
            OrphanRule::new(
                format!("notifications->{}", collection),
                NOTIFICATION_COLLECTION,
                vec![ForeignKey::new("target_id", collection)],
            )
            .matching(Filter::eq("target_type", target.as_str())),
        );
    }

    for target in ReportTarget::ALL {
        rules.push(
            OrphanRule::new(
                format!("reports->{}", target.collection()),
                REPORT_COLLECTION,
                vec![ForeignKey::new("target_id", target.collection())],
            )
            .matching(Filter::eq("target_type", target.as_str())),
        );
    }

    rules
}

pub async fn find_orphans(store: &dyn DocumentStore, rule: &OrphanRule) -> Result<Vec<ObjectId>> {
    store.anti_join(rule.collection, &rule.join()).await
}

/// Detect and, unless `dry_run`, delete the orphans of one rule
pub async fn prune(store: &dyn DocumentStore, rule: &OrphanRule, dry_run: bool) -> Result<PruneOutcome> {
    let orphans = find_orphans(store, rule).await?;
    let deleted = if dry_run || orphans.is_empty() {
        0
    } else {
        store.delete_many(rule.collection, &Filter::ids(&orphans)).await?
    };

    info!(
        rule = %rule.name,
        collection = rule.collection,
        found = orphans.len(),
        deleted,
        dry_run,
        "Orphan scan complete"
    );

    Ok(PruneOutcome {
        rule: rule.name.clone(),
        collection: rule.collection,
        found: orphans.len(),
        deleted,
        dry_run,
    })
}

/// Run every rule; a failing rule is logged and the others still run
pub async fn prune_all(store: &dyn DocumentStore, rules: &[OrphanRule], dry_run: bool) -> Vec<PruneOutcome> {
    let mut outcomes = Vec::with_capacity(rules.len());
    for rule in rules {
        match prune(store, rule, dry_run).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(rule = %rule.name, "Orphan scan failed: {}", e),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use bson::doc;

    async fn store_with_dangling_comment() -> (MemoryStore, ObjectId) {
        let store = MemoryStore::new();
        let post = ObjectId::new();
        let dangling = ObjectId::new();
        store.insert_many(POST_COLLECTION, vec![doc! { "_id": post }]).await.unwrap();
        store
            .insert_many(
                COMMENT_COLLECTION,
                vec![
                    doc! { "post_id": post },
                    doc! { "_id": dangling, "post_id": ObjectId::new() },
                ],
            )
            .await
            .unwrap();
        (store, dangling)
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_deleting() {
        let (store, dangling) = store_with_dangling_comment().await;
        let rules: Vec<_> = default_rules().into_iter().filter(|r| r.name == "comments->posts").collect();

        let outcomes = prune_all(&store, &rules, true).await;
        assert_eq!(outcomes[0].found, 1);
        assert_eq!(outcomes[0].deleted, 0);
        assert_eq!(store.count_documents(COMMENT_COLLECTION, &Filter::All).await.unwrap(), 2);

        assert_eq!(find_orphans(&store, &rules[0]).await.unwrap(), vec![dangling]);
    }

    #[tokio::test]
    async fn test_prune_deletes_only_orphans() {
        let (store, _) = store_with_dangling_comment().await;
        let rule = OrphanRule::new("comments->posts", COMMENT_COLLECTION, vec![ForeignKey::new("post_id", POST_COLLECTION)]);

        let outcome = prune(&store, &rule, false).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert!(find_orphans(&store, &rule).await.unwrap().is_empty());
        assert_eq!(store.count_documents(COMMENT_COLLECTION, &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_like_rules_only_check_their_target_type() {
        let store = MemoryStore::new();
        let (user, story) = (ObjectId::new(), ObjectId::new());
        store.insert_many(USER_COLLECTION, vec![doc! { "_id": user }]).await.unwrap();
        store
            .insert_many(STORY_COLLECTION, vec![doc! { "_id": story, "user_id": user }])
            .await
            .unwrap();
        store
            .insert_many(
                LIKE_COLLECTION,
                vec![doc! { "user_id": user, "target_id": story, "target_type": LikeTarget::Story.as_str() }],
            )
            .await
            .unwrap();

        let outcomes = prune_all(&store, &default_rules(), true).await;
        assert!(outcomes.iter().all(|o| o.found == 0));
    }

    #[tokio::test]
    async fn test_optional_keys_only_checked_when_present() {
        let store = MemoryStore::new();
        let (user, post) = (ObjectId::new(), ObjectId::new());
        let dangling_reply = ObjectId::new();
        store.insert_many(USER_COLLECTION, vec![doc! { "_id": user }]).await.unwrap();
        store
            .insert_many(POST_COLLECTION, vec![doc! { "_id": post, "user_id": user, "media_ids": [] }])
            .await
            .unwrap();
        store
            .insert_many(
                COMMENT_COLLECTION,
                vec![
                    doc! { "post_id": post, "user_id": user, "level": 0 },
                    doc! { "_id": dangling_reply, "post_id": post, "user_id": user, "level": 1, "parent_id": ObjectId::new() },
                ],
            )
            .await
            .unwrap();
        store
            .insert_many(
                NOTIFICATION_COLLECTION,
                vec![doc! { "recipient_id": user, "actor_id": user, "target_type": NotificationTarget::None.as_str() }],
            )
            .await
            .unwrap();

        let found: Vec<(String, usize)> = prune_all(&store, &default_rules(), true)
            .await
            .into_iter()
            .filter(|o| o.found > 0)
            .map(|o| (o.rule, o.found))
            .collect();
        assert_eq!(found, vec![("replies->comments".to_string(), 1)]);

        let rule = default_rules().into_iter().find(|r| r.name == "replies->comments").unwrap();
        assert_eq!(find_orphans(&store, &rule).await.unwrap(), vec![dangling_reply]);
    }

    #[tokio::test]
    async fn test_report_targets_resolve_per_type() {
        let store = MemoryStore::new();
        let (reporter, post) = (ObjectId::new(), ObjectId::new());
        store.insert_many(USER_COLLECTION, vec![doc! { "_id": reporter }]).await.unwrap();
        store
            .insert_many(POST_COLLECTION, vec![doc! { "_id": post, "user_id": reporter }])
            .await
            .unwrap();
        let misfiled = ObjectId::new();
        store
            .insert_many(
                REPORT_COLLECTION,
                vec![
                    doc! { "reporter_id": reporter, "target_id": post, "target_type": ReportTarget::Post.as_str() },
                    doc! { "reporter_id": reporter, "target_id": reporter, "target_type": ReportTarget::User.as_str() },
                    doc! { "_id": misfiled, "reporter_id": reporter, "target_id": post, "target_type": ReportTarget::Comment.as_str() },
                ],
            )
            .await
            .unwrap();

        let rule = default_rules().into_iter().find(|r| r.name == "reports->comments").unwrap();
        assert_eq!(find_orphans(&store, &rule).await.unwrap(), vec![misfiled]);
        for name in ["reports->posts", "reports->users"] {
            let rule = default_rules().into_iter().find(|r| r.name == name).unwrap();
            assert!(find_orphans(&store, &rule).await.unwrap().is_empty(), "{}", name);
        }
    }
}
