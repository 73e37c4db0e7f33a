//! Session index persistence (spec §6 wire format). The only on-disk
//! artifact the core's surrounding tooling produces; treated as a
//! durability boundary distinct from the in-memory control plane, so
//! writes are atomic (write-to-temp, fsync, rename) rather than a direct
//! overwrite.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
    pub work_dir: String,
    pub worker_count: u32,
    pub tasks_completed: u32,
    pub total_commits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accountability_summary_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionIndex {
    pub version: String,
    pub sessions: Vec<SessionRecord>,
}

impl Default for SessionIndex {
    fn default() -> Self {
        Self { version: "1.0".to_string(), sessions: Vec::new() }
    }
}

impl SessionIndex {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write-to-temp, fsync, rename — the index is never observed
    /// half-written even if the process is killed mid-write.
    pub(crate) fn save(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp_file = File::create(&tmp_path)?;
            let contents = serde_json::to_string_pretty(self)?;
            tmp_file.write_all(contents.as_bytes())?;
            tmp_file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub(crate) fn record(&mut self, session: SessionRecord) {
        if let Some(existing) = self.sessions.iter_mut().find(|s| s.id == session.id) {
            *existing = session;
        } else {
            self.sessions.push(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_atomic_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-index.json");

        let mut index = SessionIndex::default();
        index.record(SessionRecord {
            id: "s1".into(),
            start_time: Utc::now(),
            end_time: None,
            status: "running".into(),
            work_dir: "/tmp/warden".into(),
            worker_count: 2,
            tasks_completed: 0,
            total_commits: 0,
            accountability_summary_path: None,
        });
        index.save(&path).unwrap();

        let loaded = SessionIndex::load(&path).unwrap();
        assert_eq!(loaded.sessions.len(), 1);
        assert_eq!(loaded.sessions[0].id, "s1");
        assert!(!dir.path().join("session-index.tmp").exists());
    }

    #[test]
    fn missing_file_loads_as_empty_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded = SessionIndex::load(&path).unwrap();
        assert!(loaded.sessions.is_empty());
        assert_eq!(loaded.version, "1.0");
    }

    #[test]
    fn record_updates_existing_session_by_id() {
        let mut index = SessionIndex::default();
        index.record(SessionRecord {
            id: "s1".into(),
            start_time: Utc::now(),
            end_time: None,
            status: "running".into(),
            work_dir: "/tmp".into(),
            worker_count: 1,
            tasks_completed: 0,
            total_commits: 0,
            accountability_summary_path: None,
        });
        index.record(SessionRecord {
            id: "s1".into(),
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            status: "completed".into(),
            work_dir: "/tmp".into(),
            worker_count: 1,
            tasks_completed: 3,
            total_commits: 5,
            accountability_summary_path: None,
        });
        assert_eq!(index.sessions.len(), 1);
        assert_eq!(index.sessions[0].status, "completed");
    }
}
