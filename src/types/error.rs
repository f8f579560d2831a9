//! Error types for graphseed
//!
//! One taxonomy shared by the generator, the cleanup tool and the migration
//! tool. Binaries surface these through `anyhow`.

use std::time::Duration;

/// Main error type for graphseed operations
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Insert of chunk {chunk} into '{collection}' failed: {reason}")]
    Batch {
        collection: String,
        chunk: usize,
        reason: String,
    },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<SeedError>,
    },

    #[error("Invalid stage plan: {0}")]
    Plan(String),

    #[error("Migration validation failed: {0}")]
    Validation(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SeedError {
    /// Wrap an error as the failure of a named generation stage
    pub fn in_stage(stage: &'static str, err: SeedError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(err),
        }
    }

    /// Whether the error happened before any data was touched
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Plan(_) | Self::Validation(_))
    }
}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<mongodb::error::Error> for SeedError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for SeedError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<bson::de::Error> for SeedError {
    fn from(err: bson::de::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(format!("JSON error: {}", err))
    }
}

/// Result type alias for graphseed operations
pub type Result<T> = std::result::Result<T, SeedError>;
