//! Account document schema

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Entity, IntoIndexes};
use crate::db::store::IndexSpec;

/// Collection name for accounts
pub const USER_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub username: String,
    pub email: String,

    /// Argon2 password hash
    pub password: String,

    pub first_name: String,
    pub last_name: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub followers_count: i64,

    #[serde(default)]
    pub following_count: i64,

    #[serde(default)]
    pub posts_count: i64,

    #[serde(default)]
    pub blocked_users: Vec<ObjectId>,

    pub last_active_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_true() -> bool {
    true
}

impl Account {
    /// Create an active account with zeroed counters
    pub fn new(
        username: String,
        email: String,
        password: String,
        first_name: String,
        last_name: String,
        created_at: DateTime,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            username,
            email,
            password,
            first_name,
            last_name,
            bio: String::new(),
            avatar_url: None,
            location: None,
            role: Role::User,
            is_verified: false,
            is_private: false,
            is_active: true,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            blocked_users: Vec::new(),
            last_active_at: created_at,
            created_at,
            updated_at: created_at,
        }
    }
}

impl Entity for Account {
    const COLLECTION: &'static str = USER_COLLECTION;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }
}

impl IntoIndexes for Account {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::new(doc! { "username": 1 }, "username_unique").unique(),
            IndexSpec::new(doc! { "email": 1 }, "email_unique").unique(),
            IndexSpec::new(doc! { "created_at": -1 }, "created_at_index"),
            IndexSpec::new(doc! { "is_active": 1, "last_active_at": 1 }, "activity_index"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_timestamps_match() {
        let now = DateTime::now();
        let account = Account::new(
            "ada".into(),
            "ada@example.com".into(),
            "hash".into(),
            "Ada".into(),
            "Lovelace".into(),
            now,
        );
        assert_eq!(account.created_at, account.updated_at);
        assert_eq!(account.last_active_at, now);
        assert_eq!(account.followers_count, 0);
    }

    #[test]
    fn test_missing_counters_default_on_read() {
        let document = doc! {
            "_id": ObjectId::new(),
            "username": "ada",
            "email": "ada@example.com",
            "password": "hash",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "role": "moderator",
            "last_active_at": DateTime::now(),
            "created_at": DateTime::now(),
            "updated_at": DateTime::now(),
        };
        let account: Account = bson::from_document(document).unwrap();
        assert_eq!(account.role, Role::Moderator);
        assert!(account.is_active);
        assert_eq!(account.posts_count, 0);
        assert!(account.blocked_users.is_empty());
    }
}
