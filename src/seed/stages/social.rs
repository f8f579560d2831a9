//! Social containers and the follow graph

use std::collections::HashSet;

use bson::{oid::ObjectId, DateTime};
use chrono::Duration;

use crate::db::schemas::{
    Event, EventRsvp, EventVenue, Follow, FollowStatus, Group, GroupMember, GroupPrivacy,
    MemberRole, MemberStatus, RsvpStatus,
};
use crate::seed::config::SeedConfig;
use crate::seed::sampler::Sampler;
use crate::seed::slug::SlugRegistry;
use crate::seed::stages::{after, stamp, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{
    self, EVENT_KINDS, GROUP_ADJECTIVES, GROUP_NOUNS, GROUP_PRIVACY_WEIGHTS, LOCATIONS,
    RSVP_WEIGHTS, VENUE_WEIGHTS,
};

pub fn generate_groups(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Group> {
    let mut slugs = SlugRegistry::new("group");
    let mut groups = Vec::with_capacity(config.groups);

    for i in 0..config.groups {
        let Some(creator) = sampler.choose(&state.accounts) else {
            break;
        };
        let name = format!(
            "{} {}",
            words::pick(sampler, GROUP_ADJECTIVES),
            words::pick(sampler, GROUP_NOUNS)
        );
        let created_at = after(sampler, creator.created_at, state);
        groups.push(Group {
            id: ObjectId::new(),
            slug: slugs.claim(&name, i),
            name,
            description: words::paragraph(sampler),
            creator_id: creator.id,
            privacy: sampler.weighted(&GROUP_PRIVACY_WEIGHTS),
            members_count: 0,
            created_at,
            updated_at: created_at,
        });
    }

    let skipped = config.groups - groups.len();
    Generated::new(groups, skipped)
}

fn venue(sampler: &mut Sampler, slug: &str) -> EventVenue {
    let url = format!("https://meet.example.com/{}", slug);
    let location = words::pick(sampler, LOCATIONS).to_string();
    match sampler.weighted(&VENUE_WEIGHTS) {
        "online" => EventVenue::Online { url },
        "offline" => EventVenue::Offline { location },
        _ => EventVenue::Hybrid { url, location },
    }
}

pub fn generate_events(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Event> {
    let mut slugs = SlugRegistry::new("event");
    let mut events = Vec::with_capacity(config.events);

    for i in 0..config.events {
        let Some(organizer) = sampler.choose(&state.accounts) else {
            break;
        };
        let group_id = if sampler.chance(0.4) {
            sampler.choose(&state.groups).map(|g| g.id)
        } else {
            None
        };

        let title = format!(
            "{} {}",
            words::pick(sampler, LOCATIONS),
            words::pick(sampler, EVENT_KINDS)
        );
        let slug = slugs.claim(&title, i);
        let starts = sampler.datetime_between(
            state.base_time - Duration::days(30),
            state.base_time + Duration::days(60),
        );
        let ends = starts + Duration::hours(sampler.range(1, 6) as i64);
        let created_at = after(sampler, organizer.created_at, state);

        events.push(Event {
            id: ObjectId::new(),
            venue: venue(sampler, &slug),
            title,
            slug,
            description: words::paragraph(sampler),
            organizer_id: organizer.id,
            group_id,
            starts_at: stamp(starts),
            ends_at: stamp(ends),
            going_count: 0,
            maybe_count: 0,
            not_going_count: 0,
            created_at,
            updated_at: created_at,
        });
    }

    let skipped = config.events - events.len();
    Generated::new(events, skipped)
}

/// Directed follow edges
///
/// Each account gets a fan-out cap drawn from `1..=max_follows_per_account`
/// and up to `follow_attempts_per_account` attempts to reach it. An attempt
/// draws a followee with bounded retry, rejecting self and existing edges;
/// a draw that gives up counts as skipped.
pub fn generate_follows(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Follow> {
    let n = state.accounts.len();
    let mut follows = Vec::new();
    let mut skipped = 0;

    for (follower_index, follower) in state.accounts.iter().enumerate() {
        let cap = sampler.range(1, config.max_follows_per_account.max(1));
        let mut following: HashSet<usize> = HashSet::new();

        for _ in 0..config.follow_attempts_per_account {
            if following.len() >= cap {
                break;
            }
            let Some(followee_index) =
                sampler.distinct_partner(n, follower_index, |candidate| !following.contains(&candidate))
            else {
                skipped += 1;
                continue;
            };
            following.insert(followee_index);

            let followee = &state.accounts[followee_index];
            let status = if followee.is_private && sampler.chance(0.3) {
                FollowStatus::Pending
            } else if sampler.chance(0.03) {
                FollowStatus::Muted
            } else {
                FollowStatus::Accepted
            };
            let since: DateTime = follower.created_at.max(followee.created_at);
            let created_at = after(sampler, since, state);

            follows.push(Follow {
                id: ObjectId::new(),
                follower_id: follower.id,
                followee_id: followee.id,
                status,
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(follows, skipped)
}

/// Creator as admin plus distinct members, 10% of them moderators
pub fn generate_memberships(
    state: &GraphState,
    sampler: &mut Sampler,
    config: &SeedConfig,
) -> Generated<GroupMember> {
    let accounts = state.account_index();
    let mut memberships = Vec::new();
    let mut skipped = 0;

    for group in &state.groups {
        let Some(&creator) = accounts.get(&group.creator_id) else {
            skipped += 1;
            continue;
        };
        memberships.push(GroupMember {
            id: ObjectId::new(),
            group_id: group.id,
            user_id: group.creator_id,
            role: MemberRole::Admin,
            status: MemberStatus::Active,
            created_at: group.created_at,
            updated_at: group.created_at,
        });

        let wanted = sampler.range(0, config.max_members_per_group);
        for member in sampler.sample_distinct(state.accounts.len(), wanted, Some(creator)) {
            let role = if sampler.chance(0.1) {
                MemberRole::Moderator
            } else {
                MemberRole::Member
            };
            let status = if group.privacy != GroupPrivacy::Public && sampler.chance(0.15) {
                MemberStatus::Pending
            } else {
                MemberStatus::Active
            };
            let account = &state.accounts[member];
            let created_at = after(sampler, group.created_at.max(account.created_at), state);
            memberships.push(GroupMember {
                id: ObjectId::new(),
                group_id: group.id,
                user_id: account.id,
                role,
                status,
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(memberships, skipped)
}

/// Organizer going plus distinct attendees
pub fn generate_rsvps(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<EventRsvp> {
    let accounts = state.account_index();
    let mut rsvps = Vec::new();
    let mut skipped = 0;

    for event in &state.events {
        let Some(&organizer) = accounts.get(&event.organizer_id) else {
            skipped += 1;
            continue;
        };
        rsvps.push(EventRsvp {
            id: ObjectId::new(),
            event_id: event.id,
            user_id: event.organizer_id,
            status: RsvpStatus::Going,
            created_at: event.created_at,
            updated_at: event.created_at,
        });

        let wanted = sampler.range(0, config.max_rsvps_per_event);
        for attendee in sampler.sample_distinct(state.accounts.len(), wanted, Some(organizer)) {
            let created_at = after(sampler, event.created_at, state);
            rsvps.push(EventRsvp {
                id: ObjectId::new(),
                event_id: event.id,
                user_id: state.accounts[attendee].id,
                status: sampler.weighted(&RSVP_WEIGHTS),
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(rsvps, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::stages::accounts::generate_accounts;
    use chrono::Utc;
    use std::collections::HashMap;

    fn state_with_accounts(n: usize, sampler: &mut Sampler) -> GraphState {
        let mut state = GraphState::new(Utc::now());
        state.accounts = generate_accounts(&state, sampler, &SeedConfig::for_accounts(n), "hash").entities;
        state
    }

    #[test]
    fn test_follows_respect_fan_out_and_never_self() {
        let mut sampler = Sampler::seeded(21);
        let state = state_with_accounts(10, &mut sampler);
        let config = SeedConfig {
            follow_attempts_per_account: 20,
            max_follows_per_account: 5,
            ..SeedConfig::for_accounts(10)
        };

        let generated = generate_follows(&state, &mut sampler, &config);
        let mut per_follower: HashMap<ObjectId, usize> = HashMap::new();
        let mut pairs = HashSet::new();
        for follow in &generated.entities {
            assert_ne!(follow.follower_id, follow.followee_id);
            assert!(pairs.insert((follow.follower_id, follow.followee_id)));
            *per_follower.entry(follow.follower_id).or_default() += 1;
        }
        assert!(per_follower.values().all(|&n| n <= 5));
        assert!(generated.skipped <= 10 * 20);
    }

    #[test]
    fn test_follow_skips_when_no_partner_exists() {
        let mut sampler = Sampler::seeded(2);
        let state = state_with_accounts(1, &mut sampler);
        let config = SeedConfig {
            follow_attempts_per_account: 4,
            ..SeedConfig::for_accounts(1)
        };
        let generated = generate_follows(&state, &mut sampler, &config);
        assert!(generated.entities.is_empty());
        assert_eq!(generated.skipped, 4);
    }

    #[test]
    fn test_group_slugs_unique() {
        let mut sampler = Sampler::seeded(5);
        let state = state_with_accounts(5, &mut sampler);
        let config = SeedConfig {
            groups: 200,
            ..SeedConfig::for_accounts(5)
        };
        let groups = generate_groups(&state, &mut sampler, &config).entities;
        let slugs: HashSet<_> = groups.iter().map(|g| g.slug.clone()).collect();
        assert_eq!(slugs.len(), 200);
        assert!(slugs.iter().all(|s| s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')));
    }

    #[test]
    fn test_memberships_start_with_creator_admin() {
        let mut sampler = Sampler::seeded(9);
        let config = SeedConfig::for_accounts(12);
        let mut state = state_with_accounts(12, &mut sampler);
        state.groups = generate_groups(&state, &mut sampler, &config).entities;

        let members = generate_memberships(&state, &mut sampler, &config).entities;
        for group in &state.groups {
            let of_group: Vec<_> = members.iter().filter(|m| m.group_id == group.id).collect();
            assert_eq!(of_group[0].user_id, group.creator_id);
            assert_eq!(of_group[0].role, MemberRole::Admin);
            let unique: HashSet<_> = of_group.iter().map(|m| m.user_id).collect();
            assert_eq!(unique.len(), of_group.len());
        }
    }

    #[test]
    fn test_event_venue_fields_follow_type() {
        let mut sampler = Sampler::seeded(13);
        let config = SeedConfig::for_accounts(10);
        let state = state_with_accounts(10, &mut sampler);
        for event in generate_events(&state, &mut sampler, &config).entities {
            match &event.venue {
                EventVenue::Online { url } => assert!(url.ends_with(&event.slug)),
                EventVenue::Offline { location } => assert!(!location.is_empty()),
                EventVenue::Hybrid { url, location } => {
                    assert!(url.ends_with(&event.slug));
                    assert!(!location.is_empty());
                }
            }
            assert!(event.ends_at > event.starts_at);
        }
    }
}
