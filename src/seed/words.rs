//! Vocabulary and weight tables for generated content

use crate::db::schemas::{
    GroupPrivacy, MediaType, Reaction, ReportPriority, ReportStatus, ReportTarget,
    Role, RsvpStatus, Source, Visibility,
};
use crate::seed::sampler::Sampler;

pub const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Amara", "Ben", "Carla", "Chen", "Dario", "Elena", "Farah", "Gabe", "Hana",
    "Ivan", "Jade", "Kofi", "Lena", "Mateo", "Nia", "Omar", "Priya", "Quinn", "Rosa", "Sami",
    "Tara", "Uma", "Victor", "Wen", "Yara", "Zane",
];

pub const LAST_NAMES: &[&str] = &[
    "Abbott", "Baker", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito",
    "Jensen", "Kowalski", "Lopez", "Mensah", "Nakamura", "Okafor", "Petrov", "Quist", "Rossi",
    "Schmidt", "Tanaka", "Usman", "Varga", "Walsh", "Yilmaz", "Zhang",
];

pub const LOCATIONS: &[&str] = &[
    "Lisbon", "Nairobi", "Toronto", "Osaka", "Berlin", "Austin", "Sao Paulo", "Melbourne",
    "Seoul", "Dublin", "Accra", "Oslo", "Mexico City", "Mumbai",
];

pub const WORDS: &[&str] = &[
    "today", "coffee", "sunset", "project", "weekend", "music", "travel", "garden", "coding",
    "recipe", "morning", "city", "friends", "mountain", "book", "ocean", "idea", "launch",
    "photo", "training", "market", "festival", "rain", "team", "journey", "dinner", "update",
    "concert", "learning", "design",
];

pub const TOPICS: &[&str] = &[
    "photography", "rustlang", "travel", "foodie", "fitness", "music", "gaming", "startup",
    "design", "nature", "books", "coffee", "art", "science", "football", "movies", "cooking",
    "hiking", "opensource", "fashion", "crypto", "yoga", "pets", "diy", "history",
];

pub const GROUP_ADJECTIVES: &[&str] = &[
    "Weekend", "Urban", "Midnight", "Local", "Global", "Friendly", "Creative", "Open",
    "Curious", "Indie",
];

pub const GROUP_NOUNS: &[&str] = &[
    "Hikers", "Bakers", "Coders", "Readers", "Runners", "Gardeners", "Photographers",
    "Gamers", "Makers", "Cyclists", "Painters", "Chess Club",
];

pub const EVENT_KINDS: &[&str] = &[
    "Meetup", "Workshop", "Hackathon", "Picnic", "Book Swap", "Launch Party", "Webinar",
    "Tasting", "Cleanup Day", "Open Mic",
];

pub const HIGHLIGHT_TITLES: &[&str] = &["Travel", "Food", "Friends", "Pets", "Work", "Best of"];

pub const REPORT_REASONS: &[&str] = &[
    "spam", "harassment", "hate_speech", "misinformation", "nudity", "violence", "impersonation",
];

pub const VISIBILITY_WEIGHTS: [(Visibility, f64); 3] = [
    (Visibility::Public, 0.7),
    (Visibility::Friends, 0.2),
    (Visibility::Private, 0.1),
];

pub const GROUP_PRIVACY_WEIGHTS: [(GroupPrivacy, f64); 3] = [
    (GroupPrivacy::Public, 0.6),
    (GroupPrivacy::Private, 0.3),
    (GroupPrivacy::Secret, 0.1),
];

pub const SOURCE_WEIGHTS: [(Source, f64); 3] = [
    (Source::Web, 0.4),
    (Source::Mobile, 0.5),
    (Source::Api, 0.1),
];

pub const ROLE_WEIGHTS: [(Role, f64); 3] = [
    (Role::User, 0.9),
    (Role::Moderator, 0.08),
    (Role::Admin, 0.02),
];

pub const REPORT_PRIORITY_WEIGHTS: [(ReportPriority, f64); 3] = [
    (ReportPriority::Low, 0.3),
    (ReportPriority::Medium, 0.6),
    (ReportPriority::High, 0.1),
];

pub const REPORT_STATUS_WEIGHTS: [(ReportStatus, f64); 4] = [
    (ReportStatus::Pending, 0.4),
    (ReportStatus::Reviewing, 0.2),
    (ReportStatus::Resolved, 0.3),
    (ReportStatus::Rejected, 0.1),
];

pub const REPORT_TARGET_WEIGHTS: [(ReportTarget, f64); 3] = [
    (ReportTarget::Post, 0.6),
    (ReportTarget::Comment, 0.25),
    (ReportTarget::User, 0.15),
];

pub const REACTION_WEIGHTS: [(Reaction, f64); 6] = [
    (Reaction::Like, 0.6),
    (Reaction::Love, 0.2),
    (Reaction::Laugh, 0.08),
    (Reaction::Wow, 0.05),
    (Reaction::Sad, 0.04),
    (Reaction::Angry, 0.03),
];

pub const RSVP_WEIGHTS: [(RsvpStatus, f64); 3] = [
    (RsvpStatus::Going, 0.5),
    (RsvpStatus::Maybe, 0.3),
    (RsvpStatus::NotGoing, 0.2),
];

/// Venue kinds: online, offline, hybrid
pub const VENUE_WEIGHTS: [(&str, f64); 3] = [("online", 0.4), ("offline", 0.4), ("hybrid", 0.2)];

pub const MEDIA_TYPE_WEIGHTS: [(MediaType, f64); 2] = [(MediaType::Image, 0.8), (MediaType::Video, 0.2)];

/// Sentence of `min..=max` words ending with a period
pub fn sentence(sampler: &mut Sampler, min: usize, max: usize) -> String {
    let count = sampler.range(min.max(1), max.max(1));
    let words: Vec<&str> = (0..count).map(|_| pick(sampler, WORDS)).collect();
    let mut text = words.join(" ");
    if let Some(first) = text.get(0..1) {
        let upper = first.to_uppercase();
        text.replace_range(0..1, &upper);
    }
    text.push('.');
    text
}

/// One to three sentences
pub fn paragraph(sampler: &mut Sampler) -> String {
    let count = sampler.range(1, 3);
    (0..count)
        .map(|_| sentence(sampler, 4, 12))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn pick<'a>(sampler: &mut Sampler, words: &[&'a str]) -> &'a str {
    sampler.choose(words).copied().unwrap_or("")
}
