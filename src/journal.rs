//! Append-only case journal.
//!
//! Every committed transition appends one JSON line `{recorded_at,
//! case}` with the full case snapshot, so a restart replays the file
//! last-record-wins and recovers history and SLA anchors exactly.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{IoResultExt, Result};
use crate::models::TakedownRequest;

#[derive(Debug, Serialize, Deserialize)]
struct JournalLine {
    recorded_at: DateTime<Utc>,
    case: TakedownRequest,
}

/// File-backed journal, safe to share across workers.
pub struct Journal {
    path: PathBuf,
    file: Mutex<File>,
}

impl Journal {
    /// Open (creating if needed) a journal for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_path(parent.display().to_string(), "create_dir")?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_path(path.display().to_string(), "open")?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one case snapshot.
    pub fn append(&self, case: &TakedownRequest) -> Result<()> {
        let line = JournalLine {
            recorded_at: Utc::now(),
            case: case.clone(),
        };
        let mut serialized = serde_json::to_string(&line)
            .map_err(|e| crate::errors::TakedownError::internal(format!("journal encode: {e}")))?;
        serialized.push('\n');

        let mut file = self.file.lock();
        file.write_all(serialized.as_bytes())
            .with_path(self.path.display().to_string(), "append")?;
        Ok(())
    }

    /// Replay the journal: latest snapshot per case wins. Unparseable
    /// lines (torn writes from a crash) are skipped with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<HashMap<String, TakedownRequest>> {
        let path = path.as_ref();
        let mut cases = HashMap::new();
        if !path.exists() {
            return Ok(cases);
        }

        let file = File::open(path).with_path(path.display().to_string(), "open")?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_path(path.display().to_string(), "read")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalLine>(&line) {
                Ok(entry) => {
                    cases.insert(entry.case.case_id.clone(), entry.case);
                }
                Err(e) => {
                    warn!(path = %path.display(), line = index + 1, "skipping bad journal line: {e}");
                }
            }
        }
        Ok(cases)
    }
}
