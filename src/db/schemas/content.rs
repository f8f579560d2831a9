//! Content document schemas
//!
//! Hashtags, media, posts, stories and threaded comments.

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Entity, IntoIndexes};
use crate::db::store::IndexSpec;

pub const HASHTAG_COLLECTION: &str = "hashtags";
pub const MEDIA_COLLECTION: &str = "media";
pub const POST_COLLECTION: &str = "posts";
pub const STORY_COLLECTION: &str = "stories";
pub const COMMENT_COLLECTION: &str = "comments";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

/// Client the content was posted from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Web,
    Mobile,
    Api,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Hashtag {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Media {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub media_type: MediaType,
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub size_bytes: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Post document; shares are posts carrying `original_post_id`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub content: String,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub media_ids: Vec<ObjectId>,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<ObjectId>,

    #[serde(default)]
    pub likes_count: i64,

    #[serde(default)]
    pub comments_count: i64,

    #[serde(default)]
    pub shares_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Post {
    pub fn is_share(&self) -> bool {
        self.original_post_id.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Story {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<ObjectId>,

    #[serde(default)]
    pub caption: String,

    pub expires_at: DateTime,

    #[serde(default)]
    pub is_expired: bool,

    #[serde(default)]
    pub is_highlighted: bool,

    #[serde(default)]
    pub views_count: i64,

    #[serde(default)]
    pub likes_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Comment in a two-level thread
///
/// Level 0 comments have no parent. Level 1 replies point at a top-level
/// comment as both parent and root, on the same post.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub post_id: ObjectId,
    pub user_id: ObjectId,
    pub content: String,

    // Level 1 exactly when a parent is present; only the constructors set these
    level: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_id: Option<ObjectId>,

    #[serde(default)]
    pub likes_count: i64,

    #[serde(default)]
    pub replies_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Comment {
    pub fn top_level(post_id: ObjectId, user_id: ObjectId, content: String, created_at: DateTime) -> Self {
        Self {
            id: ObjectId::new(),
            post_id,
            user_id,
            content,
            level: 0,
            parent_id: None,
            root_id: None,
            likes_count: 0,
            replies_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    /// 0 for top-level comments, 1 for replies
    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn parent_id(&self) -> Option<ObjectId> {
        self.parent_id
    }

    pub fn root_id(&self) -> Option<ObjectId> {
        self.root_id
    }

    /// Reply to a top-level comment; `None` when `root` is itself a reply
    pub fn reply(root: &Comment, user_id: ObjectId, content: String, created_at: DateTime) -> Option<Self> {
        if root.level != 0 {
            return None;
        }
        Some(Self {
            id: ObjectId::new(),
            post_id: root.post_id,
            user_id,
            content,
            level: 1,
            parent_id: Some(root.id),
            root_id: Some(root.id),
            likes_count: 0,
            replies_count: 0,
            created_at,
            updated_at: created_at,
        })
    }
}

impl Entity for Hashtag {
    const COLLECTION: &'static str = HASHTAG_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Media {
    const COLLECTION: &'static str = MEDIA_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Post {
    const COLLECTION: &'static str = POST_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Story {
    const COLLECTION: &'static str = STORY_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Comment {
    const COLLECTION: &'static str = COMMENT_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl IntoIndexes for Hashtag {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "name": 1 }, "name_unique").unique()]
    }
}

impl IntoIndexes for Media {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "user_id": 1 }, "user_id_index")]
    }
}

impl IntoIndexes for Post {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "user_id": 1, "created_at": -1 }, "user_timeline_index"),
            IndexSpec::new(doc! { "created_at": -1 }, "created_at_index"),
            IndexSpec::new(doc! { "hashtags": 1 }, "hashtags_index"),
            IndexSpec::new(doc! { "original_post_id": 1 }, "original_post_index"),
        ]
    }
}

impl IntoIndexes for Story {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "user_id": 1, "created_at": -1 }, "user_stories_index"),
            IndexSpec::new(doc! { "expires_at": 1 }, "expires_at_index"),
        ]
    }
}

impl IntoIndexes for Comment {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "post_id": 1, "created_at": 1 }, "post_thread_index"),
            IndexSpec::new(doc! { "parent_id": 1 }, "parent_id_index"),
        ]
    }
}
