//! Dependency-ordered generation scheduler
//!
//! Runs the stage catalogue strictly in declared order. A stage only reads
//! entities materialized by earlier stages, and the first failing stage ends
//! the run. Writes from completed stages are left in place.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::db::DocumentStore;
use crate::seed::config::{Features, SeedConfig};
use crate::seed::resolution::{ResolutionMode, Resolver};
use crate::seed::sampler::Sampler;
use crate::seed::stages::{self, StageContext, StageOutcome};
use crate::seed::state::GraphState;
use crate::types::{Result, SeedError};

/// Coarse grouping of stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Accounts,
    TagsMedia,
    Content,
    Containers,
    Graph,
    Interactions,
    Messaging,
    Derived,
    Maintenance,
    Finalize,
}

/// One generation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Accounts,
    Hashtags,
    Media,
    Posts,
    Stories,
    Groups,
    Events,
    Follows,
    Memberships,
    Rsvps,
    Comments,
    Replies,
    Likes,
    Mentions,
    Conversations,
    Messages,
    Shares,
    StoryViews,
    Highlights,
    Notifications,
    Reports,
    Blocks,
    Aggregates,
    SeedAccounts,
}

impl StageId {
    /// Every stage in topological order
    pub const CATALOGUE: [StageId; 24] = [
        Self::Accounts,
        Self::Hashtags,
        Self::Media,
        Self::Posts,
        Self::Stories,
        Self::Groups,
        Self::Events,
        Self::Follows,
        Self::Memberships,
        Self::Rsvps,
        Self::Comments,
        Self::Replies,
        Self::Likes,
        Self::Mentions,
        Self::Conversations,
        Self::Messages,
        Self::Shares,
        Self::StoryViews,
        Self::Highlights,
        Self::Notifications,
        Self::Reports,
        Self::Blocks,
        Self::Aggregates,
        Self::SeedAccounts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Hashtags => "hashtags",
            Self::Media => "media",
            Self::Posts => "posts",
            Self::Stories => "stories",
            Self::Groups => "groups",
            Self::Events => "events",
            Self::Follows => "follows",
            Self::Memberships => "memberships",
            Self::Rsvps => "rsvps",
            Self::Comments => "comments",
            Self::Replies => "replies",
            Self::Likes => "likes",
            Self::Mentions => "mentions",
            Self::Conversations => "conversations",
            Self::Messages => "messages",
            Self::Shares => "shares",
            Self::StoryViews => "story_views",
            Self::Highlights => "highlights",
            Self::Notifications => "notifications",
            Self::Reports => "reports",
            Self::Blocks => "blocks",
            Self::Aggregates => "aggregates",
            Self::SeedAccounts => "seed_accounts",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Self::Accounts => Phase::Accounts,
            Self::Hashtags | Self::Media => Phase::TagsMedia,
            Self::Posts | Self::Stories => Phase::Content,
            Self::Groups | Self::Events => Phase::Containers,
            Self::Follows | Self::Memberships | Self::Rsvps => Phase::Graph,
            Self::Comments | Self::Replies | Self::Likes | Self::Mentions => Phase::Interactions,
            Self::Conversations | Self::Messages => Phase::Messaging,
            Self::Shares
            | Self::StoryViews
            | Self::Highlights
            | Self::Notifications
            | Self::Reports => Phase::Derived,
            Self::Blocks => Phase::Maintenance,
            Self::Aggregates | Self::SeedAccounts => Phase::Finalize,
        }
    }

    /// Stages whose output this stage cannot run without
    pub fn depends_on(self) -> &'static [StageId] {
        match self {
            Self::Accounts | Self::Hashtags | Self::Aggregates | Self::SeedAccounts => &[],
            Self::Media
            | Self::Posts
            | Self::Stories
            | Self::Groups
            | Self::Events
            | Self::Follows
            | Self::Conversations
            | Self::Notifications
            | Self::Reports
            | Self::Blocks => &[Self::Accounts],
            Self::Memberships => &[Self::Accounts, Self::Groups],
            Self::Rsvps => &[Self::Accounts, Self::Events],
            Self::Comments | Self::Mentions | Self::Shares => &[Self::Accounts, Self::Posts],
            Self::Replies => &[Self::Accounts, Self::Comments],
            Self::Likes => &[Self::Accounts, Self::Posts],
            Self::Messages => &[Self::Conversations],
            Self::StoryViews | Self::Highlights => &[Self::Accounts, Self::Stories],
        }
    }

    /// Stages whose output is used when present
    pub fn reads(self) -> &'static [StageId] {
        match self {
            Self::Posts => &[Self::Hashtags, Self::Media],
            Self::Stories => &[Self::Media],
            Self::Events => &[Self::Groups],
            Self::Likes => &[Self::Comments, Self::Replies, Self::Stories],
            Self::Notifications => &[Self::Posts, Self::Stories, Self::Groups, Self::Events],
            Self::Reports => &[Self::Posts, Self::Comments, Self::Replies],
            _ => &[],
        }
    }

    /// Whether the feature switches allow this stage
    pub fn allowed_by(self, features: &Features) -> bool {
        match self {
            Self::Hashtags => features.hashtags,
            Self::Media => features.media,
            Self::Stories | Self::StoryViews | Self::Highlights => features.stories,
            Self::Groups | Self::Events | Self::Memberships | Self::Rsvps => features.groups,
            Self::Mentions => features.mentions,
            Self::Conversations | Self::Messages => features.conversations,
            Self::Notifications => features.notifications,
            Self::Reports => features.reports,
            _ => true,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated stage order
#[derive(Debug, Clone)]
pub struct StagePlan {
    stages: Vec<StageId>,
}

impl StagePlan {
    /// Check that every dependency and read comes strictly earlier
    pub fn new(stages: Vec<StageId>) -> Result<Self> {
        for (position, stage) in stages.iter().enumerate() {
            if stages[..position].contains(stage) {
                return Err(SeedError::Plan(format!("stage '{}' listed twice", stage)));
            }
            for dependency in stage.depends_on() {
                match stages.iter().position(|s| s == dependency) {
                    Some(at) if at < position => {}
                    Some(_) => {
                        return Err(SeedError::Plan(format!(
                            "stage '{}' runs before its dependency '{}'",
                            stage, dependency
                        )))
                    }
                    None => {
                        return Err(SeedError::Plan(format!(
                            "stage '{}' depends on missing stage '{}'",
                            stage, dependency
                        )))
                    }
                }
            }
            for input in stage.reads() {
                if let Some(at) = stages.iter().position(|s| s == input) {
                    if at > position {
                        return Err(SeedError::Plan(format!(
                            "stage '{}' runs before its input '{}'",
                            stage, input
                        )));
                    }
                }
            }
        }
        Ok(Self { stages })
    }

    /// The full catalogue
    pub fn catalogue() -> Self {
        Self {
            stages: StageId::CATALOGUE.to_vec(),
        }
    }

    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Each stage paired with whether it will run under `features`
    ///
    /// A stage is disabled by its own switch or by a disabled dependency.
    pub fn resolve(&self, features: &Features) -> Vec<(StageId, bool)> {
        let mut resolved: Vec<(StageId, bool)> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let deps_enabled = stage.depends_on().iter().all(|dep| {
                resolved
                    .iter()
                    .any(|(id, enabled)| id == dep && *enabled)
            });
            resolved.push((*stage, stage.allowed_by(features) && deps_enabled));
        }
        resolved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Disabled,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: StageId,
    pub phase: Phase,
    pub status: StageStatus,
    pub generated: usize,
    pub persisted: usize,
    /// Bounded-retry draws that gave up
    pub skipped: usize,
    pub decode_skipped: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub mode: ResolutionMode,
    pub seed: Option<u64>,
    pub stages: Vec<StageReport>,
    pub elapsed_ms: u128,
}

impl GenerationReport {
    pub fn stage(&self, id: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == id)
    }

    pub fn total_persisted(&self) -> usize {
        self.stages.iter().map(|s| s.persisted).sum()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms as u64)
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generation run {} ({} mode)", self.run_id, self.mode)?;
        writeln!(
            f,
            "{:<15} {:>10} {:>10} {:>8} {:>8} {:>9}",
            "stage", "generated", "persisted", "skipped", "decode", "ms"
        )?;
        for stage in &self.stages {
            match stage.status {
                StageStatus::Disabled => writeln!(f, "{:<15} {:>10}", stage.stage.name(), "disabled")?,
                StageStatus::Completed => writeln!(
                    f,
                    "{:<15} {:>10} {:>10} {:>8} {:>8} {:>9}",
                    stage.stage.name(),
                    stage.generated,
                    stage.persisted,
                    stage.skipped,
                    stage.decode_skipped,
                    stage.elapsed_ms
                )?,
            }
        }
        write!(
            f,
            "{} documents written in {:.2}s",
            self.total_persisted(),
            self.elapsed().as_secs_f64()
        )
    }
}

/// Drives one generation run against a store
pub struct Scheduler<'a> {
    store: &'a dyn DocumentStore,
    config: SeedConfig,
    plan: StagePlan,
}

impl<'a> Scheduler<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: SeedConfig) -> Self {
        Self::with_plan(store, config, StagePlan::catalogue())
    }

    pub fn with_plan(store: &'a dyn DocumentStore, config: SeedConfig, plan: StagePlan) -> Self {
        Self { store, config, plan }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Run every enabled stage in order
    pub async fn run(&self) -> Result<GenerationReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("generation", run_id = %run_id, mode = %self.config.mode);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> Result<GenerationReport> {
        let started = Instant::now();
        let mut state = GraphState::new(Utc::now());
        let mut ctx = StageContext {
            store: self.store,
            config: &self.config,
            resolver: Resolver::new(self.config.mode, self.config.batch_size),
            sampler: Sampler::new(self.config.seed),
            bulk_password: None,
        };

        info!(
            accounts = self.config.accounts,
            seed = ?self.config.seed,
            "Starting generation"
        );

        let mut reports = Vec::with_capacity(self.plan.stages().len());
        for (stage, enabled) in self.plan.resolve(&self.config.features) {
            if !enabled {
                info!(stage = stage.name(), "Stage disabled");
                reports.push(StageReport {
                    stage,
                    phase: stage.phase(),
                    status: StageStatus::Disabled,
                    generated: 0,
                    persisted: 0,
                    skipped: 0,
                    decode_skipped: 0,
                    elapsed_ms: 0,
                });
                continue;
            }

            let stage_started = Instant::now();
            let outcome: StageOutcome = match stages::run_stage(stage, &mut ctx, &mut state).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(stage = stage.name(), "Stage failed, aborting run: {}", e);
                    return Err(SeedError::in_stage(stage.name(), e));
                }
            };
            let elapsed_ms = stage_started.elapsed().as_millis();

            info!(
                stage = stage.name(),
                generated = outcome.generated,
                persisted = outcome.persisted,
                skipped = outcome.skipped,
                decode_skipped = outcome.decode_skipped,
                elapsed_ms,
                "Stage complete"
            );

            reports.push(StageReport {
                stage,
                phase: stage.phase(),
                status: StageStatus::Completed,
                generated: outcome.generated,
                persisted: outcome.persisted,
                skipped: outcome.skipped,
                decode_skipped: outcome.decode_skipped,
                elapsed_ms,
            });
        }

        Ok(GenerationReport {
            run_id,
            mode: self.config.mode,
            seed: self.config.seed,
            stages: reports,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_a_valid_plan() {
        let plan = StagePlan::new(StageId::CATALOGUE.to_vec()).unwrap();
        assert_eq!(plan.stages().len(), 24);
    }

    #[test]
    fn test_catalogue_phases_never_go_backwards() {
        let phases: Vec<Phase> = StageId::CATALOGUE.iter().map(|s| s.phase()).collect();
        assert!(phases.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_rejects_dependency_after_dependent() {
        let err = StagePlan::new(vec![StageId::Accounts, StageId::Replies, StageId::Posts, StageId::Comments])
            .unwrap_err();
        assert!(matches!(err, SeedError::Plan(_)));
    }

    #[test]
    fn test_rejects_missing_dependency() {
        let err = StagePlan::new(vec![StageId::Follows]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_rejects_input_after_reader() {
        let err = StagePlan::new(vec![StageId::Accounts, StageId::Posts, StageId::Hashtags]).unwrap_err();
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(StagePlan::new(vec![StageId::Accounts, StageId::Accounts]).is_err());
    }

    #[test]
    fn test_disabled_feature_cascades() {
        let features = Features {
            stories: false,
            ..Features::default()
        };
        let resolved = StagePlan::catalogue().resolve(&features);
        let enabled = |id: StageId| resolved.iter().find(|(s, _)| *s == id).map(|(_, e)| *e);
        assert_eq!(enabled(StageId::Stories), Some(false));
        assert_eq!(enabled(StageId::StoryViews), Some(false));
        assert_eq!(enabled(StageId::Highlights), Some(false));
        assert_eq!(enabled(StageId::Likes), Some(true));
    }
}
