//! Credential hashing for generated accounts

pub mod password;

pub use password::{hash_password, verify_password, HashCost};
