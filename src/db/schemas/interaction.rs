//! Interaction and derived artifact schemas

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{
    Entity, IntoIndexes, COMMENT_COLLECTION, EVENT_COLLECTION, GROUP_COLLECTION, POST_COLLECTION,
    STORY_COLLECTION, USER_COLLECTION,
};
use crate::db::store::IndexSpec;

pub const LIKE_COLLECTION: &str = "likes";
pub const MENTION_COLLECTION: &str = "mentions";
pub const STORY_VIEW_COLLECTION: &str = "story_views";
pub const STORY_HIGHLIGHT_COLLECTION: &str = "story_highlights";
pub const NOTIFICATION_COLLECTION: &str = "notifications";
pub const REPORT_COLLECTION: &str = "reports";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Post,
    Comment,
    Story,
}

impl LikeTarget {
    pub const ALL: [LikeTarget; 3] = [Self::Post, Self::Comment, Self::Story];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Story => "story",
        }
    }

    /// Collection holding the liked documents
    pub fn collection(self) -> &'static str {
        match self {
            Self::Post => POST_COLLECTION,
            Self::Comment => COMMENT_COLLECTION,
            Self::Story => STORY_COLLECTION,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Love,
    Laugh,
    Wow,
    Sad,
    Angry,
}

/// Reaction edge, at most one per (user, target)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub target_id: ObjectId,
    pub target_type: LikeTarget,
    pub reaction: Reaction,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Mention {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub post_id: ObjectId,
    pub mentioner_id: ObjectId,
    pub mentioned_user_id: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoryView {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub story_id: ObjectId,
    pub viewer_id: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoryHighlight {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub title: String,
    pub story_ids: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Mention,
    Follow,
    StoryView,
    GroupInvite,
    EventInvite,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTarget {
    Post,
    Story,
    Group,
    Event,
    None,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        Self::Like,
        Self::Comment,
        Self::Mention,
        Self::Follow,
        Self::StoryView,
        Self::GroupInvite,
        Self::EventInvite,
    ];

    /// Kind of document the notification points at
    pub fn target(self) -> NotificationTarget {
        match self {
            Self::Like | Self::Comment | Self::Mention => NotificationTarget::Post,
            Self::StoryView => NotificationTarget::Story,
            Self::GroupInvite => NotificationTarget::Group,
            Self::EventInvite => NotificationTarget::Event,
            Self::Follow => NotificationTarget::None,
        }
    }
}

impl NotificationTarget {
    pub const ALL: [NotificationTarget; 5] = [Self::Post, Self::Story, Self::Group, Self::Event, Self::None];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Story => "story",
            Self::Group => "group",
            Self::Event => "event",
            Self::None => "none",
        }
    }

    pub fn collection(self) -> Option<&'static str> {
        match self {
            Self::Post => Some(POST_COLLECTION),
            Self::Story => Some(STORY_COLLECTION),
            Self::Group => Some(GROUP_COLLECTION),
            Self::Event => Some(EVENT_COLLECTION),
            Self::None => None,
        }
    }
}

/// Notification for `recipient_id` caused by `actor_id`; the two always differ
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub recipient_id: ObjectId,
    pub actor_id: ObjectId,
    pub kind: NotificationKind,
    pub target_type: NotificationTarget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<ObjectId>,

    #[serde(default)]
    pub is_read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Post,
    Comment,
    User,
}

impl ReportTarget {
    pub const ALL: [ReportTarget; 3] = [Self::Post, Self::Comment, Self::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::User => "user",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Self::Post => POST_COLLECTION,
            Self::Comment => COMMENT_COLLECTION,
            Self::User => USER_COLLECTION,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewing,
    Resolved,
    Rejected,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub reporter_id: ObjectId,
    pub target_id: ObjectId,
    pub target_type: ReportTarget,
    pub reason: String,
    pub priority: ReportPriority,
    pub status: ReportStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Entity for Like {
    const COLLECTION: &'static str = LIKE_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Mention {
    const COLLECTION: &'static str = MENTION_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for StoryView {
    const COLLECTION: &'static str = STORY_VIEW_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for StoryHighlight {
    const COLLECTION: &'static str = STORY_HIGHLIGHT_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Notification {
    const COLLECTION: &'static str = NOTIFICATION_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Report {
    const COLLECTION: &'static str = REPORT_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl IntoIndexes for Like {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "user_id": 1, "target_id": 1 }, "like_pair_unique").unique(),
            IndexSpec::new(doc! { "target_type": 1, "target_id": 1 }, "target_index"),
        ]
    }
}

impl IntoIndexes for Mention {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "mentioned_user_id": 1 }, "mentioned_user_index")]
    }
}

impl IntoIndexes for StoryView {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "story_id": 1, "viewer_id": 1 }, "story_view_unique").unique()]
    }
}

impl IntoIndexes for StoryHighlight {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "user_id": 1 }, "user_id_index")]
    }
}

impl IntoIndexes for Notification {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "recipient_id": 1, "created_at": -1 }, "recipient_feed_index"),
            IndexSpec::new(doc! { "is_read": 1, "created_at": 1 }, "read_age_index"),
        ]
    }
}

impl IntoIndexes for Report {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "status": 1, "priority": 1 }, "review_queue_index")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_targets_follow_kind() {
        assert_eq!(NotificationKind::Follow.target().collection(), None);
        assert_eq!(
            NotificationKind::EventInvite.target().collection(),
            Some(EVENT_COLLECTION)
        );
        for kind in NotificationKind::ALL {
            let rendered = bson::to_bson(&kind.target()).unwrap();
            assert_eq!(rendered.as_str(), Some(kind.target().as_str()));
        }
    }

    #[test]
    fn test_like_target_strings_match_serde() {
        for target in LikeTarget::ALL {
            let rendered = bson::to_bson(&target).unwrap();
            assert_eq!(rendered.as_str(), Some(target.as_str()));
        }
    }
}
