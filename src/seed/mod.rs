//! Synthetic social-graph generation
//!
//! A run walks an ordered [`StagePlan`]; each stage generates entities from
//! what earlier stages materialized, persists them in batches and hands the
//! canonical result to the next stage through [`GraphState`].

pub mod config;
pub mod resolution;
pub mod sampler;
pub mod scheduler;
pub mod slug;
pub mod stages;
pub mod state;
pub mod words;

pub use config::{Features, SeedConfig};
pub use resolution::{Materialized, ResolutionMode, Resolver};
pub use sampler::Sampler;
pub use scheduler::{GenerationReport, Phase, Scheduler, StageId, StagePlan, StageReport, StageStatus};
pub use stages::{clean_existing, StageOutcome};
pub use state::GraphState;
