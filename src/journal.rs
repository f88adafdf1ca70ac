use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::data_dir;
use crate::model::item::WorkItemKind;

/// One line of the run journal: what happened to a single item, or a phase
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: String,
    pub kind: WorkItemKind,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only JSONL journal of migration runs.
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn open_default() -> Self {
        Self {
            path: data_dir().join("migration-log.jsonl"),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &RunEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Reads journal lines, newest last. Unparseable lines are skipped.
    pub fn read(&self, kind: Option<WorkItemKind>, limit: Option<usize>) -> Vec<RunEvent> {
        if !self.path.exists() {
            return Vec::new();
        }
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut events: Vec<RunEvent> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .filter(|e: &RunEvent| kind.map_or(true, |k| e.kind == k))
            .collect();

        if let Some(limit) = limit {
            let len = events.len();
            if len > limit {
                events = events.split_off(len - limit);
            }
        }

        events
    }
}

pub fn new_event(
    kind: WorkItemKind,
    event_type: &str,
    item_id: Option<i64>,
    item_title: Option<&str>,
    message: Option<&str>,
) -> RunEvent {
    RunEvent {
        timestamp: chrono::Utc::now().to_rfc3339(),
        kind,
        event: event_type.to_string(),
        item_id,
        item_title: item_title.map(String::from),
        message: message.map(String::from),
    }
}
