//! Stages derived from the rest of the graph: notifications and reports

use bson::oid::ObjectId;
use chrono::Duration;

use crate::db::schemas::{Notification, NotificationKind, NotificationTarget, Report, ReportTarget};
use crate::seed::config::SeedConfig;
use crate::seed::sampler::{Sampler, MAX_ATTEMPTS};
use crate::seed::stages::{after, stamp, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{
    self, REPORT_PRIORITY_WEIGHTS, REPORT_REASONS, REPORT_STATUS_WEIGHTS, REPORT_TARGET_WEIGHTS,
};

/// Lifetime of notifications that expire
const NOTIFICATION_TTL_DAYS: i64 = 90;

/// Bounded-retry draw of an item whose owner is not `owner`
fn not_owned_by<'a, T>(
    sampler: &mut Sampler,
    items: &'a [T],
    owner: ObjectId,
    owner_of: impl Fn(&T) -> ObjectId,
) -> Option<&'a T> {
    (0..MAX_ATTEMPTS)
        .filter_map(|_| sampler.choose(items))
        .find(|item| owner_of(item) != owner)
}

pub fn generate_notifications(
    state: &GraphState,
    sampler: &mut Sampler,
    config: &SeedConfig,
) -> Generated<Notification> {
    let posts_by_owner = GraphState::by_owner(&state.posts, |p| p.user_id);
    let stories_by_owner = GraphState::by_owner(&state.stories, |s| s.user_id);
    let n = state.accounts.len();
    let mut notifications = Vec::new();
    let mut skipped = 0;

    for (recipient_index, recipient) in state.accounts.iter().enumerate() {
        for _ in 0..sampler.range(0, config.notifications_per_account) {
            let Some(actor_index) = sampler.distinct_partner(n, recipient_index, |_| true) else {
                skipped += 1;
                continue;
            };
            let Some(&kind) = sampler.choose(&NotificationKind::ALL) else {
                continue;
            };

            let target_type = kind.target();
            let target_id = match target_type {
                NotificationTarget::Post => posts_by_owner
                    .get(&recipient.id)
                    .and_then(|owned| sampler.choose(owned))
                    .map(|&i| state.posts[i].id),
                NotificationTarget::Story => stories_by_owner
                    .get(&recipient.id)
                    .and_then(|owned| sampler.choose(owned))
                    .map(|&i| state.stories[i].id),
                NotificationTarget::Group => sampler.choose(&state.groups).map(|g| g.id),
                NotificationTarget::Event => sampler.choose(&state.events).map(|e| e.id),
                NotificationTarget::None => None,
            };
            if target_type != NotificationTarget::None && target_id.is_none() {
                skipped += 1;
                continue;
            }

            let created_at = after(sampler, recipient.created_at, state);
            let expires_at = sampler
                .chance(0.3)
                .then(|| stamp(created_at.to_chrono() + Duration::days(NOTIFICATION_TTL_DAYS)));

            notifications.push(Notification {
                id: ObjectId::new(),
                recipient_id: recipient.id,
                actor_id: state.accounts[actor_index].id,
                kind,
                target_type,
                target_id,
                is_read: sampler.chance(0.5),
                expires_at,
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(notifications, skipped)
}

/// Moderation reports; nobody reports their own content or themselves
pub fn generate_reports(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Report> {
    let n = state.accounts.len();
    let mut reports = Vec::with_capacity(config.reports);
    let mut skipped = 0;

    for _ in 0..config.reports {
        let Some(reporter_index) = sampler.index(n) else {
            skipped += 1;
            continue;
        };
        let reporter = &state.accounts[reporter_index];
        let target_type = sampler.weighted(&REPORT_TARGET_WEIGHTS);

        let target = match target_type {
            ReportTarget::Post => {
                not_owned_by(sampler, &state.posts, reporter.id, |p| p.user_id).map(|p| (p.id, p.created_at))
            }
            ReportTarget::Comment => {
                not_owned_by(sampler, &state.comments, reporter.id, |c| c.user_id).map(|c| (c.id, c.created_at))
            }
            ReportTarget::User => sampler
                .distinct_partner(n, reporter_index, |_| true)
                .map(|i| (state.accounts[i].id, state.accounts[i].created_at)),
        };
        let Some((target_id, since)) = target else {
            skipped += 1;
            continue;
        };

        let created_at = after(sampler, since.max(reporter.created_at), state);
        reports.push(Report {
            id: ObjectId::new(),
            reporter_id: reporter.id,
            target_id,
            target_type,
            reason: words::pick(sampler, REPORT_REASONS).to_string(),
            priority: sampler.weighted(&REPORT_PRIORITY_WEIGHTS),
            status: sampler.weighted(&REPORT_STATUS_WEIGHTS),
            created_at,
            updated_at: created_at,
        });
    }

    Generated::new(reports, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::stages::accounts::generate_accounts;
    use crate::seed::stages::content::{generate_posts, generate_stories};
    use crate::seed::stages::interactions::generate_comments;
    use crate::seed::stages::social::generate_groups;
    use chrono::Utc;
    use std::collections::HashMap;

    fn populated(n: usize, seed: u64) -> (GraphState, Sampler, SeedConfig) {
        let mut sampler = Sampler::seeded(seed);
        let config = SeedConfig::for_accounts(n);
        let mut state = GraphState::new(Utc::now());
        state.accounts = generate_accounts(&state, &mut sampler, &config, "hash").entities;
        state.posts = generate_posts(&state, &mut sampler, &config).entities;
        state.stories = generate_stories(&state, &mut sampler, &config).entities;
        state.groups = generate_groups(&state, &mut sampler, &config).entities;
        state.comments = generate_comments(&state, &mut sampler, &config).entities;
        (state, sampler, config)
    }

    #[test]
    fn test_notifications_target_the_recipient_content() {
        let (state, mut sampler, config) = populated(15, 23);
        let notifications = generate_notifications(&state, &mut sampler, &config).entities;
        assert!(!notifications.is_empty());

        let post_owner: HashMap<_, _> = state.posts.iter().map(|p| (p.id, p.user_id)).collect();
        for notification in &notifications {
            assert_ne!(notification.actor_id, notification.recipient_id);
            assert_eq!(notification.target_type, notification.kind.target());
            match notification.target_type {
                NotificationTarget::Post => {
                    let target = notification.target_id.unwrap();
                    assert_eq!(post_owner[&target], notification.recipient_id);
                }
                NotificationTarget::None => assert!(notification.target_id.is_none()),
                _ => assert!(notification.target_id.is_some()),
            }
            if let Some(expires_at) = notification.expires_at {
                assert!(expires_at > notification.created_at);
            }
        }
    }

    #[test]
    fn test_reports_never_self_targeted() {
        let (state, mut sampler, _) = populated(12, 29);
        let config = SeedConfig {
            reports: 60,
            ..SeedConfig::for_accounts(12)
        };
        let reports = generate_reports(&state, &mut sampler, &config);
        assert_eq!(reports.entities.len() + reports.skipped, 60);

        let owners: HashMap<ObjectId, ObjectId> = state
            .posts
            .iter()
            .map(|p| (p.id, p.user_id))
            .chain(state.comments.iter().map(|c| (c.id, c.user_id)))
            .chain(state.accounts.iter().map(|a| (a.id, a.id)))
            .collect();
        for report in &reports.entities {
            assert_ne!(owners[&report.target_id], report.reporter_id);
        }
    }
}
