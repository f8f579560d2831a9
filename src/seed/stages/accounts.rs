//! Account stages: bulk accounts, blocks, fixed seed accounts

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::auth::hash_password;
use crate::db::schemas::{Account, Role, USER_COLLECTION};
use crate::db::{DocumentStore, Filter};
use crate::seed::config::SeedConfig;
use crate::seed::resolution::Resolver;
use crate::seed::sampler::Sampler;
use crate::seed::stages::{after, stamp, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{self, FIRST_NAMES, LAST_NAMES, LOCATIONS, ROLE_WEIGHTS};
use crate::types::Result;

/// Fixed accounts created at the end of every run
pub struct SeedAccount {
    pub username: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub bio: &'static str,
    pub role: Role,
    pub verified: bool,
}

pub const SEED_ACCOUNTS: [SeedAccount; 5] = [
    SeedAccount {
        username: "admin",
        email: "admin@example.com",
        password: "admin123",
        first_name: "System",
        last_name: "Administrator",
        bio: "Platform administrator",
        role: Role::Admin,
        verified: true,
    },
    SeedAccount {
        username: "testuser",
        email: "test@example.com",
        password: "password123",
        first_name: "Test",
        last_name: "User",
        bio: "Test account for development",
        role: Role::User,
        verified: false,
    },
    SeedAccount {
        username: "moderator",
        email: "mod@example.com",
        password: "password123",
        first_name: "Moderator",
        last_name: "User",
        bio: "Content moderator",
        role: Role::Moderator,
        verified: true,
    },
    SeedAccount {
        username: "premium",
        email: "premium@example.com",
        password: "password123",
        first_name: "Premium",
        last_name: "User",
        bio: "Premium account holder",
        role: Role::User,
        verified: true,
    },
    SeedAccount {
        username: "creator",
        email: "creator@example.com",
        password: "password123",
        first_name: "Content",
        last_name: "Creator",
        bio: "Content creator with many followers",
        role: Role::User,
        verified: true,
    },
];

/// Bulk accounts `user1..userN`, all sharing `password_hash`
pub fn generate_accounts(
    state: &GraphState,
    sampler: &mut Sampler,
    config: &SeedConfig,
    password_hash: &str,
) -> Generated<Account> {
    let oldest = state.base_time - Duration::days(365);
    let newest = state.base_time - Duration::days(30);

    let accounts = (0..config.accounts)
        .map(|i| {
            let username = format!("user{}", i + 1);
            let email = format!("{}@example.com", username);
            let created_at = stamp(sampler.datetime_between(oldest, newest));

            let mut account = Account::new(
                username,
                email,
                password_hash.to_string(),
                words::pick(sampler, FIRST_NAMES).to_string(),
                words::pick(sampler, LAST_NAMES).to_string(),
                created_at,
            );
            account.bio = words::sentence(sampler, 3, 10);
            account.role = sampler.weighted(&ROLE_WEIGHTS);
            account.is_private = sampler.chance(0.2);
            account.is_verified = sampler.chance(0.05);
            account.is_active = sampler.chance(0.95);
            if sampler.chance(0.8) {
                account.avatar_url = Some(format!("https://i.pravatar.cc/150?u={}", account.username));
            }
            if sampler.chance(0.6) {
                account.location = Some(words::pick(sampler, LOCATIONS).to_string());
            }
            account.last_active_at = after(sampler, created_at, state);
            account
        })
        .collect();

    Generated::new(accounts, 0)
}

/// Accounts (by index) that block others, with the blocked IDs
pub fn generate_blocks(
    state: &GraphState,
    sampler: &mut Sampler,
    config: &SeedConfig,
) -> Generated<(usize, Vec<ObjectId>)> {
    let n = state.accounts.len();
    let mut blocks = Vec::new();
    let mut skipped = 0;

    for blocker in 0..n {
        if !sampler.chance(config.blocks_percentage) {
            continue;
        }
        let wanted = sampler.range(1, 3);
        let picked = sampler.sample_distinct(n, wanted, Some(blocker));
        if picked.is_empty() {
            skipped += 1;
            continue;
        }
        let ids = picked.into_iter().map(|i| state.accounts[i].id).collect();
        blocks.push((blocker, ids));
    }

    Generated::new(blocks, skipped)
}

/// Insert the fixed seed accounts that do not exist yet
///
/// Writes go through `resolver`, so synchronized runs hand back the stored
/// copies. Returns the created accounts and how many already existed.
pub async fn create_seed_accounts(
    store: &dyn DocumentStore,
    resolver: &Resolver,
    config: &SeedConfig,
    now: DateTime<Utc>,
) -> Result<(Vec<Account>, usize)> {
    let mut created = Vec::new();
    let mut existing = 0;

    for seed in &SEED_ACCOUNTS {
        let present = store
            .count_documents(USER_COLLECTION, &Filter::eq("username", seed.username))
            .await?;
        if present > 0 {
            existing += 1;
            continue;
        }

        let hash = hash_password(seed.password, config.hash_cost)?;
        let mut account = Account::new(
            seed.username.to_string(),
            seed.email.to_string(),
            hash,
            seed.first_name.to_string(),
            seed.last_name.to_string(),
            stamp(now),
        );
        account.bio = seed.bio.to_string();
        account.role = seed.role;
        account.is_verified = seed.verified;
        created.push(account);
    }

    let materialized = resolver.materialize(store, created).await?;
    info!(
        created = materialized.persisted,
        existing,
        "Seed accounts ready"
    );
    Ok((materialized.entities, existing))
}
