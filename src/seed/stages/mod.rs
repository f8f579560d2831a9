//! Generation stages
//!
//! Each stage pairs a pure `generate_*` function over the graph state with a
//! persistence step that runs through the configured resolver.

pub mod accounts;
pub mod content;
pub mod derived;
pub mod interactions;
pub mod messaging;
pub mod social;

use bson::{doc, DateTime};
use chrono::Utc;
use tracing::{debug, warn};

use crate::aggregate::{default_counters, recompute_all};
use crate::auth::hash_password;
use crate::db::schemas::{Entity, GENERATED_COLLECTIONS, STORY_COLLECTION, USER_COLLECTION};
use crate::db::{DocumentStore, Filter};
use crate::seed::config::SeedConfig;
use crate::seed::resolution::Resolver;
use crate::seed::sampler::Sampler;
use crate::seed::scheduler::StageId;
use crate::seed::state::GraphState;
use crate::types::{Result, SeedError};

/// Entities produced by a stage before persistence
#[derive(Debug)]
pub struct Generated<T> {
    pub entities: Vec<T>,
    /// Draws abandoned after the retry cap or for lack of candidates
    pub skipped: usize,
}

impl<T> Generated<T> {
    pub fn new(entities: Vec<T>, skipped: usize) -> Self {
        Self { entities, skipped }
    }
}

/// Counts reported by a finished stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOutcome {
    pub generated: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub decode_skipped: usize,
}

/// Everything a stage needs besides the graph state
pub struct StageContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub config: &'a SeedConfig,
    pub resolver: Resolver,
    pub sampler: Sampler,
    /// Hash shared by bulk accounts, computed on first use
    pub bulk_password: Option<String>,
}

impl StageContext<'_> {
    fn bulk_password(&mut self) -> Result<String> {
        if let Some(hash) = &self.bulk_password {
            return Ok(hash.clone());
        }
        let hash = hash_password(&self.config.default_password, self.config.hash_cost)?;
        self.bulk_password = Some(hash.clone());
        Ok(hash)
    }

    async fn persist<T: Entity>(&self, generated: Generated<T>) -> Result<(Vec<T>, StageOutcome)> {
        let count = generated.entities.len();
        let materialized = self
            .resolver
            .materialize(self.store, generated.entities)
            .await?;
        Ok((
            materialized.entities,
            StageOutcome {
                generated: count,
                persisted: materialized.persisted,
                skipped: generated.skipped,
                decode_skipped: materialized.decode_skipped,
            },
        ))
    }
}

/// Convert a chrono instant into a stored timestamp
pub(crate) fn stamp(at: chrono::DateTime<Utc>) -> DateTime {
    DateTime::from_chrono(at)
}

/// Random instant between a stored timestamp and the run's base time
pub(crate) fn after(sampler: &mut Sampler, start: DateTime, state: &GraphState) -> DateTime {
    stamp(sampler.datetime_between(start.to_chrono(), state.base_time))
}

/// Execute one stage and fold its output into `state`
pub async fn run_stage(
    stage: StageId,
    ctx: &mut StageContext<'_>,
    state: &mut GraphState,
) -> Result<StageOutcome> {
    debug!(stage = stage.name(), "Running stage");

    match stage {
        StageId::Accounts => {
            let password = ctx.bulk_password()?;
            let generated = accounts::generate_accounts(state, &mut ctx.sampler, ctx.config, &password);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.accounts = entities;
            Ok(outcome)
        }
        StageId::Hashtags => {
            let generated = content::generate_hashtags(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.hashtags = entities;
            Ok(outcome)
        }
        StageId::Media => {
            let generated = content::generate_media(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.media = entities;
            Ok(outcome)
        }
        StageId::Posts => {
            let generated = content::generate_posts(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.posts = entities;
            Ok(outcome)
        }
        StageId::Stories => {
            let generated = content::generate_stories(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.stories = entities;
            Ok(outcome)
        }
        StageId::Groups => {
            let generated = social::generate_groups(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.groups = entities;
            Ok(outcome)
        }
        StageId::Events => {
            let generated = social::generate_events(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.events = entities;
            Ok(outcome)
        }
        StageId::Follows => {
            let generated = social::generate_follows(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.follows = entities;
            Ok(outcome)
        }
        StageId::Memberships => {
            let generated = social::generate_memberships(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.memberships = entities;
            Ok(outcome)
        }
        StageId::Rsvps => {
            let generated = social::generate_rsvps(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.rsvps = entities;
            Ok(outcome)
        }
        StageId::Comments => {
            let generated = interactions::generate_comments(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.comments = entities;
            Ok(outcome)
        }
        StageId::Replies => {
            let generated = interactions::generate_replies(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.comments.extend(entities);
            Ok(outcome)
        }
        StageId::Likes => {
            let generated = interactions::generate_likes(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.likes = entities;
            Ok(outcome)
        }
        StageId::Mentions => {
            let generated = interactions::generate_mentions(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.mentions = entities;
            Ok(outcome)
        }
        StageId::Conversations => {
            let generated = messaging::generate_conversations(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.conversations = entities;
            Ok(outcome)
        }
        StageId::Messages => {
            let generated = messaging::generate_messages(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.messages = entities;
            Ok(outcome)
        }
        StageId::Shares => {
            let generated = content::generate_shares(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.posts.extend(entities);
            Ok(outcome)
        }
        StageId::StoryViews => {
            let generated = interactions::generate_story_views(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.story_views = entities;
            Ok(outcome)
        }
        StageId::Highlights => {
            let generated = interactions::generate_highlights(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            let story_ids: Vec<_> = entities.iter().flat_map(|h| h.story_ids.iter().copied()).collect();
            if !story_ids.is_empty() {
                ctx.store
                    .update_many(STORY_COLLECTION, &Filter::ids(&story_ids), doc! { "is_highlighted": true })
                    .await?;
                for story in state.stories.iter_mut().filter(|s| story_ids.contains(&s.id)) {
                    story.is_highlighted = true;
                }
            }
            state.highlights = entities;
            Ok(outcome)
        }
        StageId::Notifications => {
            let generated = derived::generate_notifications(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.notifications = entities;
            Ok(outcome)
        }
        StageId::Reports => {
            let generated = derived::generate_reports(state, &mut ctx.sampler, ctx.config);
            let (entities, outcome) = ctx.persist(generated).await?;
            state.reports = entities;
            Ok(outcome)
        }
        StageId::Blocks => {
            let blocks = accounts::generate_blocks(state, &mut ctx.sampler, ctx.config);
            let mut persisted = 0;
            for (index, blocked) in &blocks.entities {
                let account = &mut state.accounts[*index];
                let ids: Vec<bson::Bson> = blocked.iter().map(|id| (*id).into()).collect();
                persisted += ctx
                    .store
                    .update_one(USER_COLLECTION, &Filter::eq("_id", account.id), doc! { "blocked_users": ids })
                    .await? as usize;
                account.blocked_users = blocked.clone();
            }
            Ok(StageOutcome {
                generated: blocks.entities.len(),
                persisted,
                skipped: blocks.skipped,
                decode_skipped: 0,
            })
        }
        StageId::Aggregates => {
            let counters = default_counters();
            let report = recompute_all(ctx.store, &counters).await?;
            if !report.failed.is_empty() {
                let failed: Vec<String> = report
                    .failed
                    .iter()
                    .map(|(name, reason)| format!("{}: {}", name, reason))
                    .collect();
                return Err(SeedError::Database(format!(
                    "counter recompute failed for {}",
                    failed.join("; ")
                )));
            }
            Ok(StageOutcome {
                generated: counters.len(),
                persisted: report.total_updated() as usize,
                skipped: 0,
                decode_skipped: 0,
            })
        }
        StageId::SeedAccounts => {
            let (created, existing) = accounts::create_seed_accounts(
                ctx.store,
                &ctx.resolver,
                ctx.config,
                state.base_time,
            )
            .await?;
            let outcome = StageOutcome {
                generated: created.len() + existing,
                persisted: created.len(),
                skipped: existing,
                decode_skipped: 0,
            };
            state.accounts.extend(created);
            Ok(outcome)
        }
    }
}

/// Delete every generated collection's documents
///
/// Best effort: a failing collection is logged and the rest still run.
pub async fn clean_existing(store: &dyn DocumentStore) -> u64 {
    let mut removed = 0;
    for collection in GENERATED_COLLECTIONS {
        match store.delete_many(collection, &Filter::All).await {
            Ok(n) => {
                debug!(collection, removed = n, "Cleared collection");
                removed += n;
            }
            Err(e) => warn!(collection, "Failed to clear collection: {}", e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_clean_existing_empties_generated_collections() {
        let store = MemoryStore::new();
        store.insert_many("posts", vec![doc! {}, doc! {}]).await.unwrap();
        store.insert_many("likes", vec![doc! {}]).await.unwrap();
        store.insert_many("migrations", vec![doc! {}]).await.unwrap();

        assert_eq!(clean_existing(&store).await, 3);
        assert_eq!(store.count_documents("migrations", &Filter::All).await.unwrap(), 1);
    }
}
