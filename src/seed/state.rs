//! Entities materialized so far in a generation run
//!
//! Each stage reads from this state and appends its own canonical output.
//! Nothing else is shared between stages.

use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::db::schemas::{
    Account, Comment, Conversation, Event, EventRsvp, Follow, Group, GroupMember, Hashtag, Like,
    Media, Mention, Message, Notification, Post, Report, Story, StoryHighlight, StoryView,
};

#[derive(Debug, Clone)]
pub struct GraphState {
    /// "Now" for the run; generated timestamps never pass it except event dates
    pub base_time: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub hashtags: Vec<Hashtag>,
    pub media: Vec<Media>,
    pub posts: Vec<Post>,
    pub stories: Vec<Story>,
    pub groups: Vec<Group>,
    pub events: Vec<Event>,
    pub follows: Vec<Follow>,
    pub memberships: Vec<GroupMember>,
    pub rsvps: Vec<EventRsvp>,
    pub likes: Vec<Like>,
    /// Top-level comments and replies
    pub comments: Vec<Comment>,
    pub mentions: Vec<Mention>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
    pub story_views: Vec<StoryView>,
    pub highlights: Vec<StoryHighlight>,
    pub notifications: Vec<Notification>,
    pub reports: Vec<Report>,
}

impl GraphState {
    pub fn new(base_time: DateTime<Utc>) -> Self {
        Self {
            base_time,
            accounts: Vec::new(),
            hashtags: Vec::new(),
            media: Vec::new(),
            posts: Vec::new(),
            stories: Vec::new(),
            groups: Vec::new(),
            events: Vec::new(),
            follows: Vec::new(),
            memberships: Vec::new(),
            rsvps: Vec::new(),
            likes: Vec::new(),
            comments: Vec::new(),
            mentions: Vec::new(),
            conversations: Vec::new(),
            messages: Vec::new(),
            story_views: Vec::new(),
            highlights: Vec::new(),
            notifications: Vec::new(),
            reports: Vec::new(),
        }
    }

    /// Position of each account by id
    pub fn account_index(&self) -> HashMap<ObjectId, usize> {
        self.accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id, i))
            .collect()
    }

    /// Indices into `items` grouped by owner
    pub fn by_owner<T, F>(items: &[T], owner: F) -> HashMap<ObjectId, Vec<usize>>
    where
        F: Fn(&T) -> ObjectId,
    {
        let mut grouped: HashMap<ObjectId, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            grouped.entry(owner(item)).or_default().push(i);
        }
        grouped
    }

    /// Posts that are not reposts
    pub fn original_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|p| !p.is_share())
    }

    pub fn top_level_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.level() == 0)
    }
}
