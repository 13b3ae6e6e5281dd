//! Execution statistics
//!
//! Collects per-instance step results and named checkpoints during a run
//! and decides whether the run succeeded.

mod summary;

pub use summary::{RunSummary, Status, RUN_SUMMARY_SCHEMA_ID, RUN_SUMMARY_SCHEMA_VERSION};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tools::Step;

/// Checkpoint taken before any instance is processed
pub const CHECKPOINT_INIT: &str = "system-initialisation";

/// Checkpoint taken after the last instance
pub const CHECKPOINT_FINISH: &str = "finish";

/// A named point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub at: DateTime<Utc>,
}

/// Result of one tool step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,

    /// Raw exit code; absent when the tool was not run to completion or
    /// did not need to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Registered test count (test step only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<usize>,

    pub success: bool,
}

impl StepRecord {
    /// Record for a tool that ran; success iff it exited zero
    pub fn from_exit(step: Step, exit_code: Option<i32>) -> Self {
        Self {
            step,
            exit_code,
            tests: None,
            success: exit_code == Some(0),
        }
    }

    /// Record for a tool that could not be run or whose output was unusable
    pub fn tool_failure(step: Step) -> Self {
        Self {
            step,
            exit_code: None,
            tests: None,
            success: false,
        }
    }
}

/// Everything recorded for one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance: String,
    pub build_tool: String,
    pub steps: Vec<StepRecord>,
}

impl InstanceRecord {
    /// No attempted step failed
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }
}

/// Statistics collected over one run
#[derive(Debug, Clone)]
pub struct ExecutionStatistics {
    started_at: DateTime<Utc>,
    checkpoints: Vec<Checkpoint>,
    instances: Vec<InstanceRecord>,
}

impl Default for ExecutionStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            checkpoints: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn checkpoint(&mut self, name: &str) {
        self.checkpoints.push(Checkpoint {
            name: name.to_string(),
            at: Utc::now(),
        });
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Start recording an instance. Registering an instance twice keeps one
    /// record.
    pub fn begin_instance(&mut self, instance: &str, build_tool: &str) {
        if self.find(instance).is_none() {
            self.instances.push(InstanceRecord {
                instance: instance.to_string(),
                build_tool: build_tool.to_string(),
                steps: Vec::new(),
            });
        }
    }

    fn find(&self, instance: &str) -> Option<usize> {
        self.instances.iter().position(|r| r.instance == instance)
    }

    /// Record a step result for `instance`, registering it if needed.
    pub fn log_step(&mut self, instance: &str, record: StepRecord) {
        let index = match self.find(instance) {
            Some(index) => index,
            None => {
                self.begin_instance(instance, "");
                self.instances.len() - 1
            }
        };
        self.instances[index].steps.push(record);
    }

    pub fn log_configure(&mut self, instance: &str, exit_code: Option<i32>) {
        self.log_step(instance, StepRecord::from_exit(Step::Configure, exit_code));
    }

    pub fn log_build(&mut self, instance: &str, exit_code: Option<i32>) {
        self.log_step(instance, StepRecord::from_exit(Step::Compile, exit_code));
    }

    /// Record a test step. A zero count without an exit code is a vacuous
    /// success.
    pub fn log_testsuite(&mut self, instance: &str, tests: usize, exit_code: Option<i32>) {
        let success = match exit_code {
            Some(code) => code == 0,
            None => tests == 0,
        };
        self.log_step(
            instance,
            StepRecord {
                step: Step::Test,
                exit_code,
                tests: Some(tests),
                success,
            },
        );
    }

    pub fn log_install(&mut self, instance: &str, exit_code: Option<i32>) {
        self.log_step(instance, StepRecord::from_exit(Step::Install, exit_code));
    }

    pub fn log_clean(&mut self, instance: &str, exit_code: Option<i32>) {
        self.log_step(instance, StepRecord::from_exit(Step::Clean, exit_code));
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        &self.instances
    }

    pub fn instance(&self, instance: &str) -> Option<&InstanceRecord> {
        self.find(instance).map(|i| &self.instances[i])
    }

    /// Number of instances processed
    pub fn count_builds(&self) -> usize {
        self.instances.len()
    }

    /// Number of instances with a failed step
    pub fn count_failed(&self) -> usize {
        self.instances.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn was_successful(&self) -> bool {
        self.count_failed() == 0
    }

    /// Milliseconds from creation to the `finish` checkpoint (or now)
    pub fn duration_ms(&self) -> u64 {
        let end = self
            .checkpoints
            .iter()
            .rev()
            .find(|c| c.name == CHECKPOINT_FINISH)
            .map(|c| c.at)
            .unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// One-line outcome for the log
    pub fn render_outcome(&self) -> String {
        let total = self.count_builds();
        let failed = self.count_failed();
        if failed == 0 {
            format!("All {} build(s) succeeded.", total)
        } else {
            format!("{} build(s) out of {} failed.", failed, total)
        }
    }
}
