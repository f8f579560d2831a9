//! Migrations shipped with the crate

use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, DateTime};
use tracing::{info, warn};

use crate::auth::{hash_password, HashCost};
use crate::db::schemas::{
    Account, Comment, Conversation, Entity, Event, EventRsvp, Follow, Group, GroupMember, Hashtag,
    IntoIndexes, Like, Media, Mention, Message, Notification, Post, Report, Role, Story,
    StoryHighlight, StoryView, ANALYTICS_COLLECTION, SESSION_COLLECTION, USER_COLLECTION,
};
use crate::db::{insert_entities, DocumentStore, Filter, IndexSpec};
use crate::migrations::{Migration, MigrationAction};
use crate::seed::stages::accounts::SEED_ACCOUNTS;
use crate::types::Result;

/// Index set of one collection
struct IndexGroup {
    collection: &'static str,
    indexes: Vec<IndexSpec>,
}

fn group_of<T: Entity + IntoIndexes>() -> IndexGroup {
    IndexGroup {
        collection: T::COLLECTION,
        indexes: T::into_indices(),
    }
}

async fn create_groups(store: &dyn DocumentStore, groups: Vec<IndexGroup>) -> Result<()> {
    for group in groups {
        info!(collection = group.collection, indexes = group.indexes.len(), "Creating indexes");
        store.create_indexes(group.collection, group.indexes).await?;
    }
    Ok(())
}

/// Drop by name; a missing index is not fatal
async fn drop_groups(store: &dyn DocumentStore, groups: Vec<IndexGroup>) -> Result<()> {
    for group in groups {
        for index in group.indexes {
            if let Err(e) = store.drop_index(group.collection, &index.name).await {
                warn!(collection = group.collection, index = %index.name, "Failed to drop index: {}", e);
            }
        }
    }
    Ok(())
}

// ============================================================================
// 001: core indexes
// ============================================================================

struct InitialIndexes;

impl InitialIndexes {
    fn groups() -> Vec<IndexGroup> {
        vec![
            group_of::<Account>(),
            group_of::<Hashtag>(),
            group_of::<Media>(),
            group_of::<Post>(),
            group_of::<Story>(),
            group_of::<Comment>(),
            group_of::<Follow>(),
            group_of::<Like>(),
            group_of::<Mention>(),
            group_of::<Conversation>(),
            group_of::<Message>(),
            group_of::<Notification>(),
            group_of::<Report>(),
            group_of::<Group>(),
            group_of::<Event>(),
        ]
    }
}

#[async_trait]
impl MigrationAction for InitialIndexes {
    async fn up(&self, store: &dyn DocumentStore) -> Result<()> {
        create_groups(store, Self::groups()).await
    }

    async fn down(&self, store: &dyn DocumentStore) -> Result<()> {
        drop_groups(store, Self::groups()).await
    }

    fn reversible(&self) -> bool {
        true
    }
}

// ============================================================================
// 002: social features and server-owned collections
// ============================================================================

struct SocialFeatures;

impl SocialFeatures {
    fn groups() -> Vec<IndexGroup> {
        vec![
            group_of::<GroupMember>(),
            group_of::<EventRsvp>(),
            group_of::<StoryView>(),
            group_of::<StoryHighlight>(),
            IndexGroup {
                collection: SESSION_COLLECTION,
                indexes: vec![
                    IndexSpec::new(doc! { "expires_at": 1 }, "expires_at_ttl").expire_after(Duration::ZERO),
                    IndexSpec::new(doc! { "user_id": 1 }, "user_id_index"),
                ],
            },
            IndexGroup {
                collection: ANALYTICS_COLLECTION,
                indexes: vec![IndexSpec::new(doc! { "created_at": -1 }, "created_at_index")],
            },
        ]
    }
}

#[async_trait]
impl MigrationAction for SocialFeatures {
    async fn up(&self, store: &dyn DocumentStore) -> Result<()> {
        create_groups(store, Self::groups()).await
    }

    async fn down(&self, store: &dyn DocumentStore) -> Result<()> {
        drop_groups(store, Self::groups()).await
    }

    fn reversible(&self) -> bool {
        true
    }
}

// ============================================================================
// 003: administrator account
// ============================================================================

struct AdminAccount {
    cost: HashCost,
}

#[async_trait]
impl MigrationAction for AdminAccount {
    async fn up(&self, store: &dyn DocumentStore) -> Result<()> {
        let admins = store
            .count_documents(USER_COLLECTION, &Filter::eq("role", "admin"))
            .await?;
        if admins > 0 {
            info!(admins, "Administrator already present, skipping");
            return Ok(());
        }

        let seed = &SEED_ACCOUNTS[0];
        let mut account = Account::new(
            seed.username.to_string(),
            seed.email.to_string(),
            hash_password(seed.password, self.cost)?,
            seed.first_name.to_string(),
            seed.last_name.to_string(),
            DateTime::now(),
        );
        account.bio = seed.bio.to_string();
        account.role = Role::Admin;
        account.is_verified = true;

        insert_entities(store, std::slice::from_ref(&account), 1).await?;
        info!(username = seed.username, "Administrator created");
        Ok(())
    }

    async fn down(&self, store: &dyn DocumentStore) -> Result<()> {
        let removed = store
            .delete_many(USER_COLLECTION, &Filter::eq("email", SEED_ACCOUNTS[0].email))
            .await?;
        info!(removed, "Administrator removed");
        Ok(())
    }

    fn reversible(&self) -> bool {
        true
    }
}

/// The built-in migration list, in application order
pub fn builtin_migrations(cost: HashCost) -> Vec<Migration> {
    vec![
        Migration::new("001_initial_indexes", "Create indexes for core collections", InitialIndexes),
        Migration::new(
            "002_add_social_features",
            "Indexes for groups, events, story views and server-owned collections",
            SocialFeatures,
        ),
        Migration::new("003_create_admin_user", "Create the default administrator", AdminAccount { cost }),
    ]
}
