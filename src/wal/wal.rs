use crate::models::blacklist::BlacklistEntry;
use crate::models::history::OutcomeRecord;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Journal operation types, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOperation {
    Blacklist { entry: BlacklistEntry },
    Unblacklist { info_hash: String },
    Outcome { record: OutcomeRecord },
}

impl WalOperation {
    fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize WAL operation")
    }

    fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse WAL operation")
    }
}

/// Append-only journal backing the blacklist and the outcome history
pub struct Wal {
    file: Mutex<File>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create WAL directory {}", parent.display()))?;
        }

        let file = open_append(&path)?;

        Ok(Wal {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one operation and sync it to disk before returning
    pub fn log_operation(&self, op: &WalOperation) -> Result<()> {
        let line = op.to_line()?;
        let mut file = self.file.lock();
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        file.sync_data().context("Failed to sync WAL")?;
        Ok(())
    }

    pub fn replay(&self) -> Result<Vec<WalOperation>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut operations = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            match WalOperation::from_line(line) {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(operations)
    }

    /// Replace the journal contents with `operations`
    ///
    /// Writes a sibling temp file and renames it over the journal, so a crash
    /// leaves either the old or the new journal in place.
    pub fn rewrite(&self, operations: &[WalOperation]) -> Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        let mut file = self.file.lock();

        {
            let tmp = File::create(&tmp_path)
                .context(format!("Failed to create {}", tmp_path.display()))?;
            let mut writer = BufWriter::new(tmp);
            for op in operations {
                writeln!(writer, "{}", op.to_line()?).context("Failed to write compacted WAL")?;
            }
            let tmp = writer.into_inner().context("Failed to flush compacted WAL")?;
            tmp.sync_all().context("Failed to sync compacted WAL")?;
        }

        fs::rename(&tmp_path, &self.path).context("Failed to replace WAL with compacted copy")?;
        *file = open_append(&self.path)?;

        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open WAL file")
}
