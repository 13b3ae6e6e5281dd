//! Scripted tool runner for testing
//!
//! Records every invocation and answers with scripted exit codes and ctest
//! output instead of spawning processes. Exit codes script `run`; `capture`
//! returns the scripted test listing.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Invocation, Step, ToolError, ToolRunner};

#[derive(Debug, Clone)]
struct ExitRule {
    step: Step,
    /// Matches when any argument or the working directory contains it
    needle: Option<String>,
    code: Option<i32>,
}

impl ExitRule {
    fn matches(&self, invocation: &Invocation) -> bool {
        if self.step != invocation.step {
            return false;
        }
        match &self.needle {
            None => true,
            Some(needle) => {
                invocation.args.iter().any(|a| a.contains(needle.as_str()))
                    || invocation
                        .cwd
                        .as_ref()
                        .is_some_and(|cwd| cwd.to_string_lossy().contains(needle.as_str()))
            }
        }
    }
}

/// Tool runner returning scripted results
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<ExitRule>,
    spawn_failures: Vec<Step>,
    test_listing: Option<String>,
    test_listings: HashMap<String, String>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Every invocation succeeds and no tests are registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` for every invocation of `step`
    pub fn with_exit_code(mut self, step: Step, code: i32) -> Self {
        self.rules.push(ExitRule {
            step,
            needle: None,
            code: Some(code),
        });
        self
    }

    /// Exit with `code` for invocations of `step` mentioning `needle`
    pub fn with_exit_code_for(mut self, step: Step, needle: &str, code: i32) -> Self {
        self.rules.push(ExitRule {
            step,
            needle: Some(needle.to_string()),
            code: Some(code),
        });
        self
    }

    /// Report termination by signal for every invocation of `step`
    pub fn with_signal(mut self, step: Step) -> Self {
        self.rules.push(ExitRule {
            step,
            needle: None,
            code: None,
        });
        self
    }

    /// Fail to spawn every invocation of `step`
    pub fn with_spawn_failure(mut self, step: Step) -> Self {
        self.spawn_failures.push(step);
        self
    }

    /// Report `count` registered tests for every build directory
    pub fn with_test_count(mut self, count: usize) -> Self {
        self.test_listing = Some(ctest_listing(count));
        self
    }

    /// Report `count` registered tests for build directories containing
    /// `needle`
    pub fn with_test_count_for(mut self, needle: &str, count: usize) -> Self {
        self.test_listings
            .insert(needle.to_string(), ctest_listing(count));
        self
    }

    /// Raw `ctest --show-only` output for every build directory
    pub fn with_test_listing(mut self, output: &str) -> Self {
        self.test_listing = Some(output.to_string());
        self
    }

    /// Every invocation so far, in call order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Rendered command lines of every invocation so far
    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.calls().iter().map(|c| c.step).collect()
    }

    fn record(&self, invocation: &Invocation) -> Result<(), ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        if self.spawn_failures.contains(&invocation.step) {
            return Err(ToolError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
            });
        }
        Ok(())
    }

    fn exit_code(&self, invocation: &Invocation) -> Option<i32> {
        // Needle rules are more specific than step-wide rules
        self.rules
            .iter()
            .filter(|r| r.needle.is_some())
            .chain(self.rules.iter().filter(|r| r.needle.is_none()))
            .find(|r| r.matches(invocation))
            .map_or(Some(0), |r| r.code)
    }
}

fn ctest_listing(count: usize) -> String {
    let mut out = String::from("Test project /scripted\n");
    for n in 1..=count {
        out.push_str(&format!("  Test #{}: test_{}\n", n, n));
    }
    out.push_str(&format!("\nTotal Tests: {}\n", count));
    out
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError> {
        self.record(invocation)?;
        Ok(self.exit_code(invocation))
    }

    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError> {
        // Exit code rules apply to `run` only; listings always succeed
        self.record(invocation)?;
        let specific = self.test_listings.iter().find(|(needle, _)| {
            invocation.args.iter().any(|a| a.contains(needle.as_str()))
        });
        Ok(match specific {
            Some((_, listing)) => listing.clone(),
            None => self
                .test_listing
                .clone()
                .unwrap_or_else(|| ctest_listing(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::cmake;
    use std::path::Path;

    #[test]
    fn test_defaults_succeed() {
        let runner = ScriptedRunner::new();
        let dir = Path::new("build");
        assert_eq!(runner.run(&cmake::build("cmake", dir)).unwrap(), Some(0));
        let listing = runner.capture(&cmake::list_tests("ctest", dir)).unwrap();
        assert_eq!(cmake::parse_test_count("ctest", &listing).unwrap(), 0);
        assert_eq!(runner.steps(), vec![Step::Compile, Step::Test]);
    }

    #[test]
    fn test_specific_rules_win() {
        let runner = ScriptedRunner::new()
            .with_exit_code(Step::Compile, 1)
            .with_exit_code_for(Step::Compile, "nucleo", 0);
        assert_eq!(
            runner.run(&cmake::build("cmake", Path::new("b/nucleo"))).unwrap(),
            Some(0)
        );
        assert_eq!(
            runner.run(&cmake::build("cmake", Path::new("b/esp32"))).unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_scripted_test_counts() {
        let runner = ScriptedRunner::new()
            .with_test_count(4)
            .with_test_count_for("esp32", 0);
        let count = |dir: &str| {
            let out = runner.capture(&cmake::list_tests("ctest", Path::new(dir))).unwrap();
            cmake::parse_test_count("ctest", &out).unwrap()
        };
        assert_eq!(count("b/nucleo"), 4);
        assert_eq!(count("b/esp32"), 0);
    }

    #[test]
    fn test_spawn_failure_is_recorded() {
        let runner = ScriptedRunner::new().with_spawn_failure(Step::Configure);
        let inv = Invocation::new(Step::Configure, "cmake");
        assert!(runner.run(&inv).is_err());
        assert_eq!(runner.calls().len(), 1);
    }
}
