//! Migration source file scaffolding

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::types::{Result, SeedError};

const TEMPLATE: &str = r#"use async_trait::async_trait;

use graphseed::db::DocumentStore;
use graphseed::migrations::MigrationAction;
use graphseed::types::Result;

/// {description}
pub struct {type_name};

#[async_trait]
impl MigrationAction for {type_name} {
    async fn up(&self, store: &dyn DocumentStore) -> Result<()> {
        let _ = store;
        Ok(())
    }

    async fn down(&self, store: &dyn DocumentStore) -> Result<()> {
        let _ = store;
        Ok(())
    }

    fn reversible(&self) -> bool {
        true
    }
}

// Register with:
// Migration::new("{id}", "{description}", {type_name})
"#;

fn words(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect()
}

fn type_name(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Write a timestamped migration template into `dir`
///
/// The id is `{YYYYmmddHHMMSS}_{snake_name}`, so scaffolded ids sort after
/// every earlier one. An existing file with the same name is an error.
pub async fn create_scaffold(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let words = words(name);
    if words.is_empty() {
        return Err(SeedError::Config(format!("invalid migration name: {:?}", name)));
    }

    let id = format!("{}_{}", now.format("%Y%m%d%H%M%S"), words.join("_"));
    let path = dir.join(format!("{}.rs", id));
    if tokio::fs::try_exists(&path).await? {
        return Err(SeedError::Migration(format!(
            "migration file already exists: {}",
            path.display()
        )));
    }

    let contents = TEMPLATE
        .replace("{type_name}", &type_name(&words))
        .replace("{id}", &id)
        .replace("{description}", &words.join(" "));

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, contents).await?;
    info!(path = %path.display(), "Migration scaffold created");
    Ok(path)
}
