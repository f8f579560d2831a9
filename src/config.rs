//! Configuration for the graphseed tools
//!
//! CLI arguments and environment variable handling using clap. Every tool
//! flattens the shared `StoreArgs`; `.env` files are loaded by the binaries
//! before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use crate::auth::HashCost;
use crate::cleanup::{CleanupAges, CleanupOp};
use crate::seed::{ResolutionMode, SeedConfig};

/// Connection, timeout and logging settings shared by every tool
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "social_media_db")]
    pub mongodb_db: String,

    /// Overall operation timeout in seconds
    #[arg(long, env = "OPERATION_TIMEOUT_SECS", default_value = "600")]
    pub timeout_secs: u64,

    /// Documents per insert call
    #[arg(long, env = "BATCH_SIZE", default_value = "100")]
    pub batch_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub verbose: bool,
}

impl StoreArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mongodb_db.trim().is_empty() {
            return Err("MONGODB_DB must not be empty".to_string());
        }

        if !self.mongodb_uri.starts_with("mongodb://") && !self.mongodb_uri.starts_with("mongodb+srv://") {
            return Err("MONGODB_URI must start with mongodb:// or mongodb+srv://".to_string());
        }

        if self.batch_size == 0 {
            return Err("BATCH_SIZE must be greater than zero".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("OPERATION_TIMEOUT_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Generator
// ============================================================================

/// graphseed - synthetic social graph generator
#[derive(Parser, Debug, Clone)]
#[command(name = "graphseed")]
#[command(about = "Populate a MongoDB database with a synthetic social graph")]
pub struct GenerateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Number of bulk accounts
    #[arg(long, default_value = "100")]
    pub accounts: usize,

    /// Posts per account
    #[arg(long, default_value = "8")]
    pub posts_per_account: usize,

    /// Hashtags in the vocabulary
    #[arg(long, default_value = "50")]
    pub hashtags: usize,

    /// Groups (defaults to accounts/8, at least 5)
    #[arg(long)]
    pub groups: Option<usize>,

    /// Events (defaults to accounts/5, at least 3)
    #[arg(long)]
    pub events: Option<usize>,

    /// Conversations (defaults to accounts/2)
    #[arg(long)]
    pub conversations: Option<usize>,

    /// Stories per account
    #[arg(long, default_value = "3")]
    pub stories_per_account: usize,

    /// Follow attempts per account
    #[arg(long, default_value = "25")]
    pub follow_attempts: usize,

    /// Upper bound on follows per account
    #[arg(long, default_value = "25")]
    pub max_follows: usize,

    /// Delete previously generated data before the run
    #[arg(long)]
    pub clean: bool,

    /// Core graph only: skip stories, mentions and reports
    #[arg(long)]
    pub minimal: bool,

    /// Sampler seed for reproducible output
    #[arg(long, env = "SEED_RNG")]
    pub seed: Option<u64>,

    /// How later stages see persisted entities
    #[arg(long, value_enum, default_value_t = ResolutionMode::Synchronized)]
    pub mode: ResolutionMode,

    /// Cheaper password hashing for throwaway datasets
    #[arg(long)]
    pub fast_hash: bool,

    /// Append a JSON run summary to this file
    #[arg(long, env = "SUMMARY_FILE")]
    pub summary_file: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;

        if self.accounts == 0 {
            return Err("--accounts must be greater than zero".to_string());
        }

        if self.max_follows == 0 {
            return Err("--max-follows must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Generation settings derived from the flags
    pub fn seed_config(&self) -> SeedConfig {
        let mut config = SeedConfig::for_accounts(self.accounts);
        config.posts_per_account = self.posts_per_account;
        config.hashtags = self.hashtags;
        config.stories_per_account = self.stories_per_account;
        config.follow_attempts_per_account = self.follow_attempts;
        config.max_follows_per_account = self.max_follows;
        if let Some(groups) = self.groups {
            config.groups = groups;
        }
        if let Some(events) = self.events {
            config.events = events;
        }
        if let Some(conversations) = self.conversations {
            config.conversations = conversations;
        }
        config.seed = self.seed;
        config.mode = self.mode;
        config.batch_size = self.store.batch_size;
        if self.fast_hash {
            config.hash_cost = HashCost::Light;
        }
        if self.minimal {
            config = config.minimal();
        }
        config
    }
}

// ============================================================================
// Cleanup
// ============================================================================

/// graphseed-cleanup - age-based pruning and consistency repair
#[derive(Parser, Debug, Clone)]
#[command(name = "graphseed-cleanup")]
#[command(about = "Prune expired data, remove orphans and repair counters")]
pub struct CleanupArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Operation to run
    #[arg(long, short, value_enum, default_value_t = CleanupOp::Stats)]
    pub operation: CleanupOp,

    /// Story age in hours before removal
    #[arg(long, default_value = "24")]
    pub stories_hours: i64,

    /// Idle session age in days
    #[arg(long, default_value = "30")]
    pub sessions_days: i64,

    /// Read notification age in days
    #[arg(long, default_value = "90")]
    pub notifications_days: i64,

    /// Analytics event age in days
    #[arg(long, default_value = "365")]
    pub analytics_days: i64,

    /// Hours to keep disappearing messages after expiry
    #[arg(long, default_value = "0")]
    pub messages_grace_hours: i64,

    /// Inactivity in days before an account is removed
    #[arg(long, default_value = "730")]
    pub inactive_user_days: i64,

    /// Report what would be removed without removing it
    #[arg(long)]
    pub dry_run: bool,

    /// Actually perform destructive operations
    #[arg(long)]
    pub force: bool,
}

impl CleanupArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;

        let ages = [
            ("--stories-hours", self.stories_hours),
            ("--sessions-days", self.sessions_days),
            ("--notifications-days", self.notifications_days),
            ("--analytics-days", self.analytics_days),
            ("--messages-grace-hours", self.messages_grace_hours),
            ("--inactive-user-days", self.inactive_user_days),
        ];
        if let Some((flag, _)) = ages.iter().find(|(_, value)| *value < 0) {
            return Err(format!("{} must not be negative", flag));
        }

        Ok(())
    }

    /// Destructive operations only run with `--force` and without `--dry-run`
    pub fn effective_dry_run(&self) -> bool {
        self.dry_run || !self.force
    }

    pub fn ages(&self) -> CleanupAges {
        CleanupAges {
            stories: chrono::Duration::hours(self.stories_hours),
            sessions: chrono::Duration::days(self.sessions_days),
            notifications: chrono::Duration::days(self.notifications_days),
            analytics: chrono::Duration::days(self.analytics_days),
            messages: chrono::Duration::hours(self.messages_grace_hours),
            inactive_users: chrono::Duration::days(self.inactive_user_days),
        }
    }
}

// ============================================================================
// Migrations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MigrateCommand {
    Up,
    Down,
    Status,
    Create,
    Reset,
    Validate,
}

/// graphseed-migrate - versioned schema migrations
#[derive(Parser, Debug, Clone)]
#[command(name = "graphseed-migrate")]
#[command(about = "Apply, roll back and inspect database migrations")]
pub struct MigrateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Command to run
    #[arg(value_enum, default_value_t = MigrateCommand::Status)]
    pub command: MigrateCommand,

    /// Migration to roll back (down)
    #[arg(long)]
    pub migration: Option<String>,

    /// Name of the new migration (create)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory for scaffolded migrations (create)
    #[arg(long, default_value = "migrations")]
    pub dir: PathBuf,

    /// Confirm destructive commands (reset)
    #[arg(long)]
    pub force: bool,

    /// List what up or down would change without applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Cheaper password hashing for the administrator migration
    #[arg(long)]
    pub fast_hash: bool,
}

impl MigrateArgs {
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;

        match self.command {
            MigrateCommand::Down if self.migration.as_deref().map_or(true, str::is_empty) => {
                Err("down requires --migration <id>".to_string())
            }
            MigrateCommand::Create if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) => {
                Err("create requires --name <name>".to_string())
            }
            MigrateCommand::Reset if !self.force => {
                Err("reset drops every collection; pass --force to confirm".to_string())
            }
            MigrateCommand::Up | MigrateCommand::Down => Ok(()),
            _ if self.dry_run => Err("--dry-run only applies to up and down".to_string()),
            _ => Ok(()),
        }
    }

    pub fn hash_cost(&self) -> HashCost {
        if self.fast_hash {
            HashCost::Light
        } else {
            HashCost::Standard
        }
    }

    /// Commands that never need a database connection
    pub fn is_offline(&self) -> bool {
        matches!(self.command, MigrateCommand::Create | MigrateCommand::Validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults_validate() {
        let args = GenerateArgs::parse_from(["graphseed"]);
        assert!(args.validate().is_ok());

        let config = args.seed_config();
        assert_eq!(config.accounts, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.mode, ResolutionMode::Synchronized);
    }

    #[test]
    fn test_store_validation_rules() {
        let bad_scheme = GenerateArgs::parse_from(["graphseed", "--mongodb-uri", "http://localhost"]);
        assert!(bad_scheme.validate().is_err());

        let empty_db = GenerateArgs::parse_from(["graphseed", "--mongodb-db", " "]);
        assert!(empty_db.validate().is_err());

        let zero_batch = GenerateArgs::parse_from(["graphseed", "--batch-size", "0"]);
        assert!(zero_batch.validate().is_err());

        let zero_timeout = GenerateArgs::parse_from(["graphseed", "--timeout-secs", "0"]);
        assert!(zero_timeout.validate().is_err());

        let srv = GenerateArgs::parse_from(["graphseed", "--mongodb-uri", "mongodb+srv://cluster.example.net"]);
        assert!(srv.validate().is_ok());
    }

    #[test]
    fn test_generate_overrides_and_minimal() {
        let args = GenerateArgs::parse_from([
            "graphseed",
            "--accounts",
            "40",
            "--groups",
            "2",
            "--minimal",
            "--fast-hash",
            "--mode",
            "optimistic",
        ]);
        let config = args.seed_config();
        assert_eq!(config.groups, 2);
        assert_eq!(config.events, 8);
        assert!(!config.features.stories);
        assert_eq!(config.hash_cost, HashCost::Light);
        assert_eq!(config.mode, ResolutionMode::Optimistic);
    }

    #[test]
    fn test_cleanup_dry_run_resolution() {
        let default = CleanupArgs::parse_from(["graphseed-cleanup", "-o", "stories"]);
        assert!(default.effective_dry_run());

        let forced = CleanupArgs::parse_from(["graphseed-cleanup", "-o", "stories", "--force"]);
        assert!(!forced.effective_dry_run());

        let both = CleanupArgs::parse_from(["graphseed-cleanup", "-o", "stories", "--force", "--dry-run"]);
        assert!(both.effective_dry_run());
    }

    #[test]
    fn test_cleanup_ages_from_flags() {
        let args = CleanupArgs::parse_from(["graphseed-cleanup", "--stories-hours", "48"]);
        let ages = args.ages();
        assert_eq!(ages.stories, chrono::Duration::hours(48));
        assert_eq!(ages.inactive_users, chrono::Duration::days(730));

        let negative = CleanupArgs::parse_from(["graphseed-cleanup", "--analytics-days=-1"]);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_migrate_command_requirements() {
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "down"]).validate().is_err());
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "down", "--migration", "001_initial_indexes"])
            .validate()
            .is_ok());
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "create"]).validate().is_err());
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "reset"]).validate().is_err());
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "reset", "--force"]).validate().is_ok());

        assert!(MigrateArgs::parse_from(["graphseed-migrate", "up", "--dry-run"]).validate().is_ok());
        assert!(MigrateArgs::parse_from(["graphseed-migrate", "status", "--dry-run"]).validate().is_err());

        let create = MigrateArgs::parse_from(["graphseed-migrate", "create", "--name", "add badges"]);
        assert!(create.validate().is_ok());
        assert!(create.is_offline());
    }
}
