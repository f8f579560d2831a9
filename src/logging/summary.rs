//! Machine-readable run summaries
//!
//! Writes one JSON object per run to a JSONL file so successive runs against
//! the same dataset can be compared.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use crate::types::Result;

#[derive(Debug, Serialize)]
struct SummaryLine<'a, T: Serialize> {
    timestamp: DateTime<Utc>,
    tool: &'a str,
    run_id: &'a str,
    summary: &'a T,
}

/// Appends run summaries to a JSONL file
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    path: PathBuf,
}

impl SummaryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one summary line
    pub fn append<T: Serialize>(&self, tool: &str, run_id: &str, summary: &T) -> Result<()> {
        let line = SummaryLine {
            timestamp: Utc::now(),
            tool,
            run_id,
            summary,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(path = %self.path.display(), "Wrote run summary");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Counts {
        users: u64,
    }

    #[test]
    fn test_appends_one_line_per_run() {
        let path = std::env::temp_dir().join(format!("graphseed-summary-{}.jsonl", uuid::Uuid::new_v4()));
        let writer = SummaryWriter::new(&path);

        writer.append("graphseed", "run-1", &Counts { users: 10 }).unwrap();
        writer.append("graphseed", "run-2", &Counts { users: 12 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["run_id"], "run-2");
        assert_eq!(lines[1]["summary"]["users"], 12);

        std::fs::remove_file(&path).unwrap();
    }
}
