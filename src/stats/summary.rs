//! Run summary (JSON report of one run)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::{Checkpoint, ExecutionStatistics, InstanceRecord};

/// Schema version for the run summary
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the run summary
pub const RUN_SUMMARY_SCHEMA_ID: &str = "mmh-system/run_summary@1";

/// Aggregated run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// Run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// build, rebuild or clean
    pub operation: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Aggregated status
    pub status: Status,

    /// Process exit code for this run
    pub exit_code: i32,

    pub instance_count: usize,
    pub instances_succeeded: usize,
    pub instances_failed: usize,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    /// Human-readable summary
    pub human_summary: String,

    pub checkpoints: Vec<Checkpoint>,

    pub instances: Vec<InstanceRecord>,
}

impl RunSummary {
    /// Summarize collected statistics
    pub fn from_statistics(operation: &str, stats: &ExecutionStatistics) -> Self {
        let instance_count = stats.count_builds();
        let instances_failed = stats.count_failed();
        let status = if stats.was_successful() {
            Status::Success
        } else {
            Status::Failed
        };

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            operation: operation.to_string(),
            created_at: Utc::now(),
            status,
            exit_code: match status {
                Status::Success => 0,
                Status::Failed => 1,
            },
            instance_count,
            instances_succeeded: instance_count - instances_failed,
            instances_failed,
            duration_ms: stats.duration_ms(),
            human_summary: stats.render_outcome(),
            checkpoints: stats.checkpoints().to_vec(),
            instances: stats.instances().to_vec(),
        }
    }

    /// Descriptors of failed instances
    pub fn failed_instances(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|r| !r.succeeded())
            .map(|r| r.instance.as_str())
            .collect()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{CHECKPOINT_FINISH, CHECKPOINT_INIT};
    use tempfile::TempDir;

    fn stats() -> ExecutionStatistics {
        let mut stats = ExecutionStatistics::new();
        stats.checkpoint(CHECKPOINT_INIT);
        stats.begin_instance("boards/a/gcc/debug", "ninja");
        stats.log_configure("boards/a/gcc/debug", Some(0));
        stats.begin_instance("boards/b/gcc/debug", "ninja");
        stats.log_configure("boards/b/gcc/debug", Some(1));
        stats.checkpoint(CHECKPOINT_FINISH);
        stats
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_statistics("build", &stats());
        assert_eq!(summary.status, Status::Failed);
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.instance_count, 2);
        assert_eq!(summary.instances_succeeded, 1);
        assert_eq!(summary.failed_instances(), vec!["boards/b/gcc/debug"]);
        assert_eq!(summary.human_summary, "1 build(s) out of 2 failed.");
    }

    #[test]
    fn test_empty_summary_succeeds() {
        let summary = RunSummary::from_statistics("clean", &ExecutionStatistics::new());
        assert_eq!(summary.status, Status::Success);
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn test_json_and_file() {
        let summary = RunSummary::from_statistics("rebuild", &stats());
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"schema_id\": \"mmh-system/run_summary@1\""));
        assert!(json.contains("\"step\": \"configure\""));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        summary.write_to_file(&path).unwrap();
        let loaded = RunSummary::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.operation, "rebuild");
        assert_eq!(loaded.instances.len(), 2);
        assert_eq!(loaded.checkpoints.len(), 2);
    }
}
