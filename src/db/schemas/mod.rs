//! Document schemas for the generated social graph
//!
//! Every generated document carries a client-assigned `_id` plus
//! `created_at`/`updated_at`. Counter fields are written by the aggregate
//! engine only and always default to zero on read.

mod account;
mod content;
mod interaction;
mod messaging;
mod social;

use bson::{oid::ObjectId, DateTime};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::store::IndexSpec;

pub use account::{Account, Role, USER_COLLECTION};
pub use content::{
    Comment, Hashtag, Media, MediaType, Post, Source, Story, Visibility, COMMENT_COLLECTION,
    HASHTAG_COLLECTION, MEDIA_COLLECTION, POST_COLLECTION, STORY_COLLECTION,
};
pub use interaction::{
    Like, LikeTarget, Mention, Notification, NotificationKind, NotificationTarget, Reaction,
    Report, ReportPriority, ReportStatus, ReportTarget, StoryHighlight, StoryView,
    LIKE_COLLECTION, MENTION_COLLECTION, NOTIFICATION_COLLECTION, REPORT_COLLECTION,
    STORY_HIGHLIGHT_COLLECTION, STORY_VIEW_COLLECTION,
};
pub use messaging::{
    Conversation, ConversationKind, Message, CONVERSATION_COLLECTION, MESSAGE_COLLECTION,
};
pub use social::{
    Event, EventRsvp, EventVenue, Follow, FollowStatus, Group, GroupMember, GroupPrivacy,
    MemberRole, MemberStatus, RsvpStatus, EVENT_COLLECTION, EVENT_RSVP_COLLECTION,
    FOLLOW_COLLECTION, GROUP_COLLECTION, GROUP_MEMBER_COLLECTION,
};

/// Sessions written by the application server, pruned by cleanup
pub const SESSION_COLLECTION: &str = "user_sessions";

/// Analytics events written by the application server, pruned by cleanup
pub const ANALYTICS_COLLECTION: &str = "analytics_events";

/// Applied-migration ledger
pub const MIGRATION_COLLECTION: &str = "migrations";

/// Collections populated by the generator, in stage order
pub const GENERATED_COLLECTIONS: &[&str] = &[
    USER_COLLECTION,
    HASHTAG_COLLECTION,
    MEDIA_COLLECTION,
    POST_COLLECTION,
    STORY_COLLECTION,
    GROUP_COLLECTION,
    EVENT_COLLECTION,
    FOLLOW_COLLECTION,
    GROUP_MEMBER_COLLECTION,
    EVENT_RSVP_COLLECTION,
    LIKE_COLLECTION,
    COMMENT_COLLECTION,
    MENTION_COLLECTION,
    CONVERSATION_COLLECTION,
    MESSAGE_COLLECTION,
    STORY_VIEW_COLLECTION,
    STORY_HIGHLIGHT_COLLECTION,
    NOTIFICATION_COLLECTION,
    REPORT_COLLECTION,
];

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<IndexSpec>;
}

/// A document type stored in one collection
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> ObjectId;

    fn created_at(&self) -> DateTime;
}
