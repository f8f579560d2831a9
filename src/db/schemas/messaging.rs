//! Conversation and message schemas

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Entity, IntoIndexes};
use crate::db::store::IndexSpec;
use crate::types::{Result, SeedError};

pub const CONVERSATION_COLLECTION: &str = "conversations";
pub const MESSAGE_COLLECTION: &str = "messages";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub participants: Vec<ObjectId>,
    pub kind: ConversationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub messages_count: i64,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Conversation {
    /// Build a conversation from a participant list
    ///
    /// Duplicates are removed keeping first occurrence. Two participants make
    /// a direct conversation, more make a group one.
    pub fn new(participants: Vec<ObjectId>, title: Option<String>, created_at: DateTime) -> Result<Self> {
        let mut unique: Vec<ObjectId> = Vec::with_capacity(participants.len());
        for participant in participants {
            if !unique.contains(&participant) {
                unique.push(participant);
            }
        }

        if unique.len() < 2 {
            return Err(SeedError::Validation(format!(
                "conversation needs at least 2 distinct participants, got {}",
                unique.len()
            )));
        }

        let kind = if unique.len() == 2 {
            ConversationKind::Direct
        } else {
            ConversationKind::Group
        };

        Ok(Self {
            id: ObjectId::new(),
            participants: unique,
            kind,
            title: if kind == ConversationKind::Group { title } else { None },
            messages_count: 0,
            created_at,
            updated_at: created_at,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub conversation_id: ObjectId,
    pub sender_id: ObjectId,
    pub content: String,

    #[serde(default)]
    pub is_read: bool,

    /// Disappearing messages carry an expiry
    #[serde(default)]
    pub is_expired: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Entity for Conversation {
    const COLLECTION: &'static str = CONVERSATION_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl Entity for Message {
    const COLLECTION: &'static str = MESSAGE_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl IntoIndexes for Conversation {
    fn into_indices() -> Vec<IndexSpec> {
        vec![IndexSpec::new(doc! { "participants": 1 }, "participants_index")]
    }
}

impl IntoIndexes for Message {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "conversation_id": 1, "created_at": 1 }, "conversation_history_index"),
            IndexSpec::new(doc! { "expires_at": 1 }, "expires_at_index"),
        ]
    }
}
