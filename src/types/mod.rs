//! Shared types

mod error;

pub use error::{Result, SeedError};
