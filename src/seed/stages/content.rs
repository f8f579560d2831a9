//! Content stages: hashtags, media, posts, stories and shares

use std::collections::HashSet;

use bson::oid::ObjectId;
use chrono::Duration;

use crate::db::schemas::{Hashtag, Media, MediaType, Post, Story, Visibility};
use crate::seed::config::SeedConfig;
use crate::seed::sampler::Sampler;
use crate::seed::stages::{after, stamp, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{self, MEDIA_TYPE_WEIGHTS, SOURCE_WEIGHTS, TOPICS, VISIBILITY_WEIGHTS};

/// Story lifetime before it expires
pub const STORY_TTL_HOURS: i64 = 24;

pub fn generate_hashtags(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Hashtag> {
    let oldest = state.base_time - Duration::days(365);
    let mut names: HashSet<String> = HashSet::new();
    let mut hashtags = Vec::with_capacity(config.hashtags);

    for i in 0..config.hashtags {
        let base = TOPICS[i % TOPICS.len()];
        let name = if i < TOPICS.len() {
            base.to_string()
        } else {
            format!("{}{}", base, i / TOPICS.len())
        };
        if !names.insert(name.clone()) {
            continue;
        }
        let created_at = stamp(sampler.datetime_between(oldest, state.base_time));
        hashtags.push(Hashtag {
            id: ObjectId::new(),
            name,
            created_at,
            updated_at: created_at,
        });
    }

    Generated::new(hashtags, 0)
}

pub fn generate_media(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Media> {
    let mut media = Vec::new();
    for account in &state.accounts {
        for _ in 0..sampler.range(0, config.media_per_account) {
            let id = ObjectId::new();
            let media_type = sampler.weighted(&MEDIA_TYPE_WEIGHTS);
            let (extension, width, height) = match media_type {
                MediaType::Image => ("jpg", 1080, 1080),
                MediaType::Video => ("mp4", 1920, 1080),
            };
            let created_at = after(sampler, account.created_at, state);
            media.push(Media {
                id,
                user_id: account.id,
                media_type,
                url: format!("https://cdn.example.com/media/{}.{}", id.to_hex(), extension),
                width,
                height,
                size_bytes: sampler.range(50_000, 8_000_000) as i64,
                created_at,
                updated_at: created_at,
            });
        }
    }
    Generated::new(media, 0)
}

pub fn generate_posts(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Post> {
    let media_by_owner = GraphState::by_owner(&state.media, |m| m.user_id);
    let mut posts = Vec::new();

    for account in &state.accounts {
        let count = sampler.range(0, config.posts_per_account * 2);
        for _ in 0..count {
            let mut content = words::paragraph(sampler);
            let mut tags: Vec<String> = Vec::new();
            if !state.hashtags.is_empty() {
                for _ in 0..sampler.range(0, 3) {
                    if let Some(tag) = sampler.choose(&state.hashtags) {
                        if !tags.contains(&tag.name) {
                            tags.push(tag.name.clone());
                        }
                    }
                }
                for tag in &tags {
                    content.push_str(&format!(" #{}", tag));
                }
            }

            let mut media_ids = Vec::new();
            if let Some(owned) = media_by_owner.get(&account.id) {
                if sampler.chance(0.3) {
                    let picked = sampler.sample_distinct(owned.len(), owned.len().min(2), None);
                    media_ids = picked.into_iter().map(|i| state.media[owned[i]].id).collect();
                }
            }

            let created_at = after(sampler, account.created_at, state);
            posts.push(Post {
                id: ObjectId::new(),
                user_id: account.id,
                content,
                visibility: sampler.weighted(&VISIBILITY_WEIGHTS),
                source: sampler.weighted(&SOURCE_WEIGHTS),
                media_ids,
                hashtags: tags,
                original_post_id: None,
                likes_count: 0,
                comments_count: 0,
                shares_count: 0,
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(posts, 0)
}

/// Stories from the last two days; older than the TTL means expired
pub fn generate_stories(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Story> {
    let media_by_owner = GraphState::by_owner(&state.media, |m| m.user_id);
    let window_start = state.base_time - Duration::hours(STORY_TTL_HOURS * 2);
    let mut stories = Vec::new();

    for account in &state.accounts {
        if !sampler.chance(0.4) {
            continue;
        }
        for _ in 0..sampler.range(1, config.stories_per_account) {
            let start = window_start.max(account.created_at.to_chrono());
            let created = sampler.datetime_between(start, state.base_time);
            let expires = created + Duration::hours(STORY_TTL_HOURS);
            let media_id = media_by_owner
                .get(&account.id)
                .and_then(|owned| sampler.choose(owned))
                .map(|&i| state.media[i].id);

            stories.push(Story {
                id: ObjectId::new(),
                user_id: account.id,
                media_id,
                caption: words::sentence(sampler, 2, 8),
                expires_at: stamp(expires),
                is_expired: expires <= state.base_time,
                is_highlighted: false,
                views_count: 0,
                likes_count: 0,
                created_at: stamp(created),
                updated_at: stamp(created),
            });
        }
    }

    Generated::new(stories, 0)
}

/// Reposts of public posts by someone other than the author
pub fn generate_shares(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Post> {
    let accounts = state.account_index();
    let mut shares = Vec::new();
    let mut skipped = 0;

    for original in state.original_posts() {
        if original.visibility != Visibility::Public || !sampler.chance(config.shares_percentage) {
            continue;
        }
        let Some(&author) = accounts.get(&original.user_id) else {
            skipped += 1;
            continue;
        };
        let Some(sharer) = sampler.distinct_partner(state.accounts.len(), author, |_| true) else {
            skipped += 1;
            continue;
        };

        let created_at = after(sampler, original.created_at, state);
        shares.push(Post {
            id: ObjectId::new(),
            user_id: state.accounts[sharer].id,
            content: words::sentence(sampler, 2, 8),
            visibility: Visibility::Public,
            source: sampler.weighted(&SOURCE_WEIGHTS),
            media_ids: Vec::new(),
            hashtags: Vec::new(),
            original_post_id: Some(original.id),
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at,
            updated_at: created_at,
        });
    }

    Generated::new(shares, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::stages::accounts::generate_accounts;
    use chrono::Utc;

    fn state_with_accounts(n: usize, sampler: &mut Sampler) -> GraphState {
        let mut state = GraphState::new(Utc::now());
        state.accounts = generate_accounts(&state, sampler, &SeedConfig::for_accounts(n), "hash").entities;
        state
    }

    #[test]
    fn test_hashtag_names_unique_beyond_vocabulary() {
        let state = GraphState::new(Utc::now());
        let mut sampler = Sampler::seeded(1);
        let config = SeedConfig {
            hashtags: TOPICS.len() * 3,
            ..SeedConfig::for_accounts(1)
        };
        let generated = generate_hashtags(&state, &mut sampler, &config);
        let names: HashSet<_> = generated.entities.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names.len(), TOPICS.len() * 3);
    }

    #[test]
    fn test_posts_reference_owned_media_and_known_tags() {
        let mut sampler = Sampler::seeded(4);
        let config = SeedConfig::for_accounts(15);
        let mut state = state_with_accounts(15, &mut sampler);
        state.hashtags = generate_hashtags(&state, &mut sampler, &config).entities;
        state.media = generate_media(&state, &mut sampler, &config).entities;

        let posts = generate_posts(&state, &mut sampler, &config).entities;
        assert!(!posts.is_empty());
        let tag_names: HashSet<_> = state.hashtags.iter().map(|h| h.name.clone()).collect();
        for post in &posts {
            assert!(post.created_at.to_chrono() <= state.base_time);
            assert!(post.hashtags.iter().all(|t| tag_names.contains(t)));
            for media_id in &post.media_ids {
                let media = state.media.iter().find(|m| m.id == *media_id).unwrap();
                assert_eq!(media.user_id, post.user_id);
            }
        }
    }

    #[test]
    fn test_story_expiry_matches_ttl() {
        let mut sampler = Sampler::seeded(6);
        let config = SeedConfig::for_accounts(30);
        let state = state_with_accounts(30, &mut sampler);
        let stories = generate_stories(&state, &mut sampler, &config).entities;
        assert!(!stories.is_empty());
        for story in &stories {
            let ttl = story.expires_at.to_chrono() - story.created_at.to_chrono();
            assert_eq!(ttl, Duration::hours(STORY_TTL_HOURS));
            assert_eq!(story.is_expired, story.expires_at.to_chrono() <= state.base_time);
        }
    }

    #[test]
    fn test_shares_never_by_author() {
        let mut sampler = Sampler::seeded(8);
        let config = SeedConfig {
            shares_percentage: 1.0,
            ..SeedConfig::for_accounts(10)
        };
        let mut state = state_with_accounts(10, &mut sampler);
        state.posts = generate_posts(&state, &mut sampler, &config).entities;

        let shares = generate_shares(&state, &mut sampler, &config);
        for share in &shares.entities {
            let original = state.posts.iter().find(|p| Some(p.id) == share.original_post_id).unwrap();
            assert_ne!(original.user_id, share.user_id);
            assert_eq!(original.visibility, Visibility::Public);
        }
    }
}
