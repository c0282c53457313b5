//! Session journal - writes session transitions to file
//!
//! Records are written in JSONL format (one JSON object per line)
//! to the file specified in config. Disabled journals swallow records.

use crate::domain::session::SessionSnapshot;
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// One journal line
#[derive(Debug, Serialize)]
pub struct JournalRecord<'a> {
    /// Write timestamp (ISO 8601)
    pub ts: String,
    pub session: &'a str,
    /// Transition or rejection name (e.g. "positioning_started")
    pub event: &'a str,
    pub map: &'a str,
    pub positioning: &'a str,
    pub navigation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'a str>,
}

/// Append-only writer for session records
pub struct Journal {
    file_path: Option<String>,
}

impl Journal {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "journal_initialized");
        Self { file_path: Some(file_path.to_string()) }
    }

    pub fn disabled() -> Self {
        Self { file_path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file_path.is_some()
    }

    /// Record an event against the given snapshot
    /// Returns true if written, false if disabled or on error
    pub fn record(&self, event: &str, snapshot: &SessionSnapshot, detail: Option<&str>) -> bool {
        let Some(ref file_path) = self.file_path else {
            return false;
        };

        let record = JournalRecord {
            ts: Utc::now().to_rfc3339(),
            session: &snapshot.session_id,
            event,
            map: snapshot.map.as_str(),
            positioning: snapshot.positioning.as_str(),
            navigation: snapshot.navigation.as_str(),
            detail,
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                error!(event = %event, error = %e, "journal_serialize_failed");
                return false;
            }
        };

        match Self::append_line(file_path, &line) {
            Ok(()) => true,
            Err(e) => {
                error!(event = %event, file = %file_path, error = %e, "journal_write_failed");
                false
            }
        }
    }

    fn append_line(file_path: &str, line: &str) -> std::io::Result<()> {
        let path = Path::new(file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %file_path, bytes = %line.len(), "journal_written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Session;
    use crate::domain::types::{Bounds, Building, Coordinate};
    use std::fs;
    use tempfile::tempdir;

    fn snapshot() -> SessionSnapshot {
        Session::new(Building {
            identifier: "b1".to_string(),
            name: String::new(),
            bounds: Bounds {
                south_west: Coordinate::new(1.0, 1.0),
                north_east: Coordinate::new(2.0, 2.0),
            },
            center: Coordinate::new(1.5, 1.5),
            rotation: 0.0,
        })
        .snapshot()
    }

    #[test]
    fn test_disabled_journal_writes_nothing() {
        let journal = Journal::disabled();
        assert!(!journal.is_enabled());
        assert!(!journal.record("map_mounted", &snapshot(), None));
    }

    #[test]
    fn test_record_appends_jsonl() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("session.jsonl");
        let journal = Journal::new(file_path.to_str().unwrap());
        let snapshot = snapshot();

        assert!(journal.record("map_mounted", &snapshot, None));
        assert!(journal.record("rejected", &snapshot, Some("This building has no POIs")));

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "map_mounted");
        assert_eq!(first["session"], snapshot.session_id.as_str());
        assert_eq!(first["positioning"], "idle");
        assert!(first.get("detail").is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["detail"], "This building has no POIs");
    }
}
