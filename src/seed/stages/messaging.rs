//! Conversations and their messages

use bson::oid::ObjectId;
use chrono::Duration;
use tracing::warn;

use crate::db::schemas::{Conversation, Message};
use crate::seed::config::SeedConfig;
use crate::seed::sampler::Sampler;
use crate::seed::stages::{after, stamp, Generated};
use crate::seed::state::GraphState;
use crate::seed::words::{self, GROUP_NOUNS};

/// Direct conversations most of the time, small group chats otherwise
pub fn generate_conversations(
    state: &GraphState,
    sampler: &mut Sampler,
    config: &SeedConfig,
) -> Generated<Conversation> {
    let n = state.accounts.len();
    let mut conversations = Vec::with_capacity(config.conversations);
    let mut skipped = 0;

    for _ in 0..config.conversations {
        let size = if sampler.chance(0.7) { 2 } else { sampler.range(3, 6) };
        let members = sampler.sample_distinct(n, size, None);
        let participants: Vec<ObjectId> = members.iter().map(|&i| state.accounts[i].id).collect();
        let since = members
            .iter()
            .map(|&i| state.accounts[i].created_at)
            .max();
        let Some(since) = since else {
            skipped += 1;
            continue;
        };

        let title = Some(format!("{} chat", words::pick(sampler, GROUP_NOUNS)));
        let created_at = after(sampler, since, state);
        match Conversation::new(participants, title, created_at) {
            Ok(conversation) => conversations.push(conversation),
            Err(e) => {
                warn!("Skipping conversation: {}", e);
                skipped += 1;
            }
        }
    }

    Generated::new(conversations, skipped)
}

/// Messages from participants; 70% read, 10% disappearing after a day
pub fn generate_messages(state: &GraphState, sampler: &mut Sampler, config: &SeedConfig) -> Generated<Message> {
    let mut messages = Vec::new();

    for conversation in &state.conversations {
        for _ in 0..sampler.range(1, config.max_messages_per_conversation) {
            let Some(&sender_id) = sampler.choose(&conversation.participants) else {
                break;
            };
            let created_at = after(sampler, conversation.created_at, state);
            let expires_at = if sampler.chance(0.1) {
                Some(created_at.to_chrono() + Duration::hours(24))
            } else {
                None
            };

            messages.push(Message {
                id: ObjectId::new(),
                conversation_id: conversation.id,
                sender_id,
                content: words::sentence(sampler, 1, 20),
                is_read: sampler.chance(0.7),
                is_expired: expires_at.is_some_and(|at| at <= state.base_time),
                expires_at: expires_at.map(stamp),
                created_at,
                updated_at: created_at,
            });
        }
    }

    Generated::new(messages, 0)
}
