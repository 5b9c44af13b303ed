//! Journal - Append-only JSONL Records of Bets, Claims and Fees
//!
//! Persists journal entries to daily JSONL files in the format
//! `journal/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON
//! record, so a crash can lose at most the line being written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::ports::repository::{JournalEntry, Repository};

/// Append-only JSONL journal with daily file rotation.
///
/// Entries are filed under the UTC date of their own timestamp.
pub struct JsonlJournal {
    /// Directory holding the daily files.
    journal_dir: PathBuf,
}

impl JsonlJournal {
    /// Create a journal under `<data_dir>/journal`, creating it if needed.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let journal_dir = Path::new(data_dir).join("journal");

        fs::create_dir_all(&journal_dir)
            .await
            .context("Failed to create journal directory")?;

        Ok(Self { journal_dir })
    }

    fn file_for(&self, entry: &JournalEntry) -> PathBuf {
        let date = entry.timestamp.format("%Y-%m-%d");
        self.journal_dir.join(format!("{date}.jsonl"))
    }
}

#[async_trait]
impl Repository for JsonlJournal {
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        let path = self.file_for(entry);

        let mut json = serde_json::to_string(entry).context("Failed to serialize journal entry")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write journal entry")?;

        file.flush().await.context("Failed to flush journal")?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.journal_dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<JournalEntry>(line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            error = %e,
                            "Skipping malformed journal line"
                        );
                    }
                }
            }
        }

        entries.sort_by_key(|e| e.timestamp);
        info!(count = entries.len(), "Loaded journal entries");
        Ok(entries)
    }

    async fn is_healthy(&self) -> bool {
        let marker = self.journal_dir.join(".health_check");
        let result = fs::write(&marker, b"ok").await;
        let _ = fs::remove_file(&marker).await;
        result.is_ok()
    }
}
