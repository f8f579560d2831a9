//! Interaction stages: comments, replies, likes, mentions, story views and highlights

use std::collections::HashMap;

use bson::{oid::ObjectId, DateTime};

use crate::db::schemas::{Comment, Like, LikeTarget, Mention, StoryHighlight, StoryView};
use crate::seed::config::SeedConfig;
use crate::seed::sampler::Sampler;
use crate::seed::stages::{after, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{self, HIGHLIGHT_TITLES, REACTION_WEIGHTS};

/// Top-level comments on original posts
pub fn generate_comments(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Comment> {
    let mut comments = Vec::new();
    if state.accounts.is_empty() {
        return Generated::new(comments, 0);
    }

    for post in state.original_posts() {
        if !sampler.chance(config.comments_percentage) {
            continue;
        }
        for _ in 0..sampler.range(1, config.max_comments_per_post) {
            let Some(author) = sampler.choose(&state.accounts) else {
                break;
            };
            let created_at = after(sampler, post.created_at.max(author.created_at), state);
            comments.push(Comment::top_level(
                post.id,
                author.id,
                words::sentence(sampler, 3, 15),
                created_at,
            ));
        }
    }

    Generated::new(comments, 0)
}

/// Level-one replies to top-level comments
pub fn generate_replies(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Comment> {
    let mut replies = Vec::new();
    let mut skipped = 0;

    for root in state.top_level_comments() {
        if !sampler.chance(config.replies_percentage) {
            continue;
        }
        for _ in 0..sampler.range(1, config.max_replies_per_comment) {
            let Some(author) = sampler.choose(&state.accounts) else {
                break;
            };
            let created_at = after(sampler, root.created_at.max(author.created_at), state);
            match Comment::reply(root, author.id, words::sentence(sampler, 2, 10), created_at) {
                Some(reply) => replies.push(reply),
                None => skipped += 1,
            }
        }
    }

    Generated::new(replies, skipped)
}

/// Distinct likers for one target, never its owner
fn like_target(
    state: &GraphState,
    sampler: &mut Sampler,
    accounts: &HashMap<ObjectId, usize>,
    target: (LikeTarget, ObjectId, ObjectId, DateTime),
    wanted: usize,
    likes: &mut Vec<Like>,
) -> bool {
    let (target_type, target_id, owner, since) = target;
    let Some(&owner_index) = accounts.get(&owner) else {
        return false;
    };
    for liker in sampler.sample_distinct(state.accounts.len(), wanted, Some(owner_index)) {
        let account = &state.accounts[liker];
        let created_at = after(sampler, since.max(account.created_at), state);
        likes.push(Like {
            id: ObjectId::new(),
            user_id: account.id,
            target_id,
            target_type,
            reaction: sampler.weighted(&REACTION_WEIGHTS),
            created_at,
            updated_at: created_at,
        });
    }
    true
}

/// Likes on posts, comments and stories
///
/// Posts are liked with `likes_percentage`, comments 30% of the time and
/// stories half the time. Each (user, target) pair appears at most once.
pub fn generate_likes(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Like> {
    let accounts = state.account_index();
    let mut likes = Vec::new();
    let mut skipped = 0;

    for post in &state.posts {
        if !sampler.chance(config.likes_percentage) {
            continue;
        }
        let wanted = sampler.range(1, config.max_likes_per_post);
        let target = (LikeTarget::Post, post.id, post.user_id, post.created_at);
        if !like_target(state, sampler, &accounts, target, wanted, &mut likes) {
            skipped += 1;
        }
    }

    for comment in &state.comments {
        if !sampler.chance(0.3) {
            continue;
        }
        let wanted = sampler.range(1, 5);
        let target = (LikeTarget::Comment, comment.id, comment.user_id, comment.created_at);
        if !like_target(state, sampler, &accounts, target, wanted, &mut likes) {
            skipped += 1;
        }
    }

    for story in &state.stories {
        if !sampler.chance(0.5) {
            continue;
        }
        let wanted = sampler.range(1, 10);
        let target = (LikeTarget::Story, story.id, story.user_id, story.created_at);
        if !like_target(state, sampler, &accounts, target, wanted, &mut likes) {
            skipped += 1;
        }
    }

    Generated::new(likes, skipped)
}

/// One or two distinct accounts mentioned per selected post, never the author
pub fn generate_mentions(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Mention> {
    let accounts = state.account_index();
    let mut mentions = Vec::new();
    let mut skipped = 0;

    for post in state.original_posts() {
        if !sampler.chance(config.mentions_percentage) {
            continue;
        }
        let Some(&author) = accounts.get(&post.user_id) else {
            skipped += 1;
            continue;
        };
        let wanted = sampler.range(1, 2);
        let mentioned = sampler.sample_distinct(state.accounts.len(), wanted, Some(author));
        if mentioned.is_empty() {
            skipped += 1;
            continue;
        }
        for index in mentioned {
            mentions.push(Mention {
                id: ObjectId::new(),
                post_id: post.id,
                mentioner_id: post.user_id,
                mentioned_user_id: state.accounts[index].id,
                created_at: post.created_at,
                updated_at: post.created_at,
            });
        }
    }

    Generated::new(mentions, skipped)
}

pub fn generate_story_views(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<StoryView> {
    let accounts = state.account_index();
    let mut views = Vec::new();
    let mut skipped = 0;

    for story in &state.stories {
        let Some(&owner) = accounts.get(&story.user_id) else {
            skipped += 1;
            continue;
        };
        let wanted = sampler.range(0, config.max_views_per_story);
        for viewer in sampler.sample_distinct(state.accounts.len(), wanted, Some(owner)) {
            let created_at = after(sampler, story.created_at, state);
            views.push(StoryView {
                id: ObjectId::new(),
                story_id: story.id,
                viewer_id: state.accounts[viewer].id,
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(views, skipped)
}

/// Highlights collecting up to five of an owner's expired stories
pub fn generate_highlights(
    state: &GraphState,
    sampler: &mut Sampler,
    _config: &SeedConfig,
) -> Generated<StoryHighlight> {
    let mut expired: HashMap<ObjectId, Vec<usize>> = HashMap::new();
    for (i, story) in state.stories.iter().enumerate() {
        if story.is_expired {
            expired.entry(story.user_id).or_default().push(i);
        }
    }

    let mut highlights = Vec::new();
    for account in &state.accounts {
        let Some(owned) = expired.get(&account.id) else {
            continue;
        };
        if !sampler.chance(0.3) {
            continue;
        }
        let wanted = sampler.range(1, owned.len().min(5));
        let story_ids: Vec<ObjectId> = sampler
            .sample_distinct(owned.len(), wanted, None)
            .into_iter()
            .map(|i| state.stories[owned[i]].id)
            .collect();
        let newest = story_ids
            .iter()
            .filter_map(|id| state.stories.iter().find(|s| s.id == *id))
            .map(|s| s.created_at)
            .max()
            .unwrap_or(account.created_at);
        let created_at = after(sampler, newest, state);

        highlights.push(StoryHighlight {
            id: ObjectId::new(),
            user_id: account.id,
            title: words::pick(sampler, HIGHLIGHT_TITLES).to_string(),
            story_ids,
            created_at,
            updated_at: created_at,
        });
    }

    Generated::new(highlights, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::stages::accounts::generate_accounts;
    use crate::seed::stages::content::{generate_posts, generate_stories};
    use chrono::Utc;
    use std::collections::HashSet;

    fn populated(n: usize, seed: u64) -> (GraphState, Sampler, SeedConfig) {
        let mut sampler = Sampler::seeded(seed);
        let config = SeedConfig::for_accounts(n);
        let mut state = GraphState::new(Utc::now());
        state.accounts = generate_accounts(&state, &mut sampler, &config, "hash").entities;
        state.posts = generate_posts(&state, &mut sampler, &config).entities;
        state.stories = generate_stories(&state, &mut sampler, &config).entities;
        (state, sampler, config)
    }

    #[test]
    fn test_replies_point_at_top_level_roots() {
        let (mut state, mut sampler, config) = populated(10, 3);
        state.comments = generate_comments(&state, &mut sampler, &config).entities;
        assert!(!state.comments.is_empty());

        let replies = generate_replies(&state, &mut sampler, &config);
        assert_eq!(replies.skipped, 0);
        for reply in &replies.entities {
            let root = state.comments.iter().find(|c| Some(c.id) == reply.root_id()).unwrap();
            assert_eq!(root.level(), 0);
            assert_eq!(reply.level(), 1);
            assert_eq!(reply.parent_id(), reply.root_id());
            assert_eq!(reply.post_id, root.post_id);
        }
    }

    #[test]
    fn test_likes_unique_per_user_and_target() {
        let (mut state, mut sampler, config) = populated(12, 7);
        state.comments = generate_comments(&state, &mut sampler, &config).entities;

        let likes = generate_likes(&state, &mut sampler, &config).entities;
        assert!(!likes.is_empty());
        let mut seen = HashSet::new();
        for like in &likes {
            assert!(seen.insert((like.user_id, like.target_id)));
        }
        let owners: HashMap<ObjectId, ObjectId> = state
            .posts
            .iter()
            .map(|p| (p.id, p.user_id))
            .chain(state.comments.iter().map(|c| (c.id, c.user_id)))
            .chain(state.stories.iter().map(|s| (s.id, s.user_id)))
            .collect();
        assert!(likes.iter().all(|l| owners[&l.target_id] != l.user_id));
    }

    #[test]
    fn test_mentions_skip_the_author() {
        let (state, mut sampler, _) = populated(8, 11);
        let config = SeedConfig {
            mentions_percentage: 1.0,
            ..SeedConfig::for_accounts(8)
        };
        let mentions = generate_mentions(&state, &mut sampler, &config).entities;
        assert!(!mentions.is_empty());
        assert!(mentions.iter().all(|m| m.mentioner_id != m.mentioned_user_id));
    }

    #[test]
    fn test_highlights_only_hold_own_expired_stories() {
        let (state, mut sampler, config) = populated(40, 17);
        let highlights = generate_highlights(&state, &mut sampler, &config).entities;
        for highlight in &highlights {
            assert!(!highlight.story_ids.is_empty() && highlight.story_ids.len() <= 5);
            for id in &highlight.story_ids {
                let story = state.stories.iter().find(|s| s.id == *id).unwrap();
                assert!(story.is_expired);
                assert_eq!(story.user_id, highlight.user_id);
            }
        }
    }
}
