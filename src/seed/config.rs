//! Generation configuration

use serde::Serialize;

use crate::auth::HashCost;
use crate::db::DEFAULT_BATCH_SIZE;
use crate::seed::resolution::ResolutionMode;

/// Optional generation features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Features {
    pub hashtags: bool,
    pub media: bool,
    pub groups: bool,
    pub stories: bool,
    pub conversations: bool,
    pub notifications: bool,
    pub mentions: bool,
    pub reports: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            hashtags: true,
            media: true,
            groups: true,
            stories: true,
            conversations: true,
            notifications: true,
            mentions: true,
            reports: true,
        }
    }
}

impl Features {
    /// Core graph only: no stories, mentions or reports
    pub fn minimal() -> Self {
        Self {
            stories: false,
            mentions: false,
            reports: false,
            ..Self::default()
        }
    }
}

/// Sizes, ratios and switches for one generation run
#[derive(Debug, Clone, Serialize)]
pub struct SeedConfig {
    pub accounts: usize,
    pub posts_per_account: usize,
    pub hashtags: usize,
    pub media_per_account: usize,
    pub stories_per_account: usize,
    pub groups: usize,
    pub events: usize,
    pub follow_attempts_per_account: usize,
    pub max_follows_per_account: usize,
    pub max_members_per_group: usize,
    pub max_rsvps_per_event: usize,
    pub max_likes_per_post: usize,
    pub likes_percentage: f64,
    pub max_comments_per_post: usize,
    pub comments_percentage: f64,
    pub max_replies_per_comment: usize,
    pub replies_percentage: f64,
    pub mentions_percentage: f64,
    pub conversations: usize,
    pub max_messages_per_conversation: usize,
    pub shares_percentage: f64,
    pub max_views_per_story: usize,
    pub notifications_per_account: usize,
    pub reports: usize,
    pub blocks_percentage: f64,
    pub features: Features,
    pub seed: Option<u64>,
    pub mode: ResolutionMode,
    pub batch_size: usize,
    #[serde(skip)]
    pub hash_cost: HashCost,
    /// Password shared by every bulk account
    #[serde(skip)]
    pub default_password: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self::for_accounts(100)
    }
}

impl SeedConfig {
    /// Defaults scaled to an account count
    ///
    /// Groups default to accounts/8 (at least 5), events to accounts/5
    /// (at least 3), conversations to accounts/2.
    pub fn for_accounts(accounts: usize) -> Self {
        Self {
            accounts,
            posts_per_account: 8,
            hashtags: 50,
            media_per_account: 3,
            stories_per_account: 3,
            groups: (accounts / 8).max(5),
            events: (accounts / 5).max(3),
            follow_attempts_per_account: 25,
            max_follows_per_account: 25,
            max_members_per_group: 30,
            max_rsvps_per_event: 25,
            max_likes_per_post: 40,
            likes_percentage: 0.85,
            max_comments_per_post: 12,
            comments_percentage: 0.75,
            max_replies_per_comment: 3,
            replies_percentage: 0.3,
            mentions_percentage: 0.2,
            conversations: accounts / 2,
            max_messages_per_conversation: 20,
            shares_percentage: 0.1,
            max_views_per_story: 30,
            notifications_per_account: 5,
            reports: (accounts / 5).max(1),
            blocks_percentage: 0.05,
            features: Features::default(),
            seed: None,
            mode: ResolutionMode::Synchronized,
            batch_size: DEFAULT_BATCH_SIZE,
            hash_cost: HashCost::Standard,
            default_password: "password123".to_string(),
        }
    }

    pub fn minimal(mut self) -> Self {
        self.features = Features::minimal();
        self
    }
}
