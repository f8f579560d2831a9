//! Social container and graph schemas
//!
//! Groups and events own membership and attendance edges stored in their
//! own collections. Follows are directed edges between accounts.

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Entity, IntoIndexes};
use crate::db::store::IndexSpec;

pub const GROUP_COLLECTION: &str = "groups";
pub const EVENT_COLLECTION: &str = "events";
pub const FOLLOW_COLLECTION: &str = "follows";
pub const GROUP_MEMBER_COLLECTION: &str = "group_members";
pub const EVENT_RSVP_COLLECTION: &str = "event_rsvps";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupPrivacy {
    #[default]
    Public,
    Private,
    Secret,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub slug: String,

    #[serde(default)]
    pub description: String,

    pub creator_id: ObjectId,

    #[serde(default)]
    pub privacy: GroupPrivacy,

    #[serde(default)]
    pub members_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Where an event takes place
///
/// Online events carry a URL, offline ones a location, hybrid ones both.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventVenue {
    Online { url: String },
    Offline { location: String },
    Hybrid { url: String, location: String },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub slug: String,

    #[serde(default)]
    pub description: String,

    pub organizer_id: ObjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<ObjectId>,

    pub venue: EventVenue,
    pub starts_at: DateTime,
    pub ends_at: DateTime,

    #[serde(default)]
    pub going_count: i64,

    #[serde(default)]
    pub maybe_count: i64,

    #[serde(default)]
    pub not_going_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Accepted,
    Blocked,
    Muted,
}

/// Directed follow edge, unique per (follower, followee)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Follow {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub follower_id: ObjectId,
    pub followee_id: ObjectId,
    pub status: FollowStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Moderator,
    Member,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GroupMember {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub group_id: ObjectId,
    pub user_id: ObjectId,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Maybe => "maybe",
            Self::NotGoing => "not_going",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventRsvp {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub event_id: ObjectId,
    pub user_id: ObjectId,
    pub status: RsvpStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Entity for Group {
    const COLLECTION: &'static str = GROUP_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Event {
    const COLLECTION: &'static str = EVENT_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Follow {
    const COLLECTION: &'static str = FOLLOW_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for GroupMember {
    const COLLECTION: &'static str = GROUP_MEMBER_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for EventRsvp {
    const COLLECTION: &'static str = EVENT_RSVP_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl IntoIndexes for Group {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "slug": 1 }, "slug_unique").unique(),
            IndexSpec::new(doc! { "creator_id": 1 }, "creator_id_index"),
        ]
    }
}

impl IntoIndexes for Event {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "slug": 1 }, "slug_unique").unique(),
            IndexSpec::new(doc! { "starts_at": 1 }, "starts_at_index"),
            IndexSpec::new(doc! { "group_id": 1 }, "group_id_index"),
        ]
    }
}

impl IntoIndexes for Follow {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "follower_id": 1, "followee_id": 1 }, "follow_pair_unique").unique(),
            IndexSpec::new(doc! { "followee_id": 1, "status": 1 }, "followee_status_index"),
        ]
    }
}

impl IntoIndexes for GroupMember {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "group_id": 1, "user_id": 1 }, "membership_unique").unique(),
            IndexSpec::new(doc! { "user_id": 1 }, "user_id_index"),
        ]
    }
}

impl IntoIndexes for EventRsvp {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "event_id": 1, "user_id": 1 }, "rsvp_unique").unique()]
    }
}
