//! System instances and their build lifecycle
//!
//! Each step runs one or more tool invocations, records the outcome in the
//! execution statistics and advances the instance state. Step failures are
//! results (`Ok(false)`), not errors.

mod resolve;

pub use resolve::{module_directories, BuildLayout, ResolvedInstance};

use tracing::{info, warn};

use mmh_matrix::{InstanceDescriptor, SystemSpec};

use crate::config::ToolConfig;
use crate::error::SystemResult;
use crate::state::{InstanceLifecycle, InstanceState};
use crate::stats::{ExecutionStatistics, StepRecord};
use crate::tools::{cmake, Invocation, Step, ToolRunner};

/// What every instance of a run shares
#[derive(Clone, Copy)]
pub struct InstanceContext<'a> {
    pub tools: &'a ToolConfig,
    pub runner: &'a dyn ToolRunner,
    /// Extra arguments for every configure call
    pub cmake_args: &'a [String],
}

/// One instance of the build matrix
#[derive(Debug, Clone)]
pub struct SystemInstance {
    name: String,
    resolved: ResolvedInstance,
    lifecycle: InstanceLifecycle,
}

impl SystemInstance {
    pub fn new(resolved: ResolvedInstance) -> Self {
        let name = resolved.name();
        Self {
            lifecycle: InstanceLifecycle::new(&name),
            name,
            resolved,
        }
    }

    pub fn resolve(
        spec: &SystemSpec,
        descriptor: &InstanceDescriptor,
        layout: &BuildLayout,
    ) -> SystemResult<Self> {
        Ok(Self::new(ResolvedInstance::resolve(spec, descriptor, layout)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolved(&self) -> &ResolvedInstance {
        &self.resolved
    }

    pub fn state(&self) -> InstanceState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &InstanceLifecycle {
        &self.lifecycle
    }

    /// Run an invocation; tool errors are logged and reported as no exit code.
    fn execute(&self, ctx: &InstanceContext<'_>, invocation: &Invocation) -> Option<i32> {
        match ctx.runner.run(invocation) {
            Ok(code) => {
                if code != Some(0) {
                    warn!(instance = %self.name, step = %invocation.step, exit_code = ?code, "step failed");
                }
                code
            }
            Err(e) => {
                warn!(instance = %self.name, step = %invocation.step, error = %e, "step failed");
                None
            }
        }
    }

    pub fn configure(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        info!(instance = %self.name, step = "configure", "configuring system instance");
        let mut args = self.resolved.configure.clone();
        args.extra = ctx.cmake_args.to_vec();

        let code = self.execute(ctx, &cmake::configure(&ctx.tools.cmake, &args));
        stats.log_configure(&self.name, code);
        let success = code == Some(0);
        self.lifecycle
            .complete(Step::Configure, success, InstanceState::Configured)?;
        Ok(success)
    }

    pub fn compile(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        info!(instance = %self.name, step = "compile", "compiling system instance");
        let code = self.execute(ctx, &cmake::build(&ctx.tools.cmake, &self.resolved.build_dir));
        stats.log_build(&self.name, code);
        let success = code == Some(0);
        self.lifecycle
            .complete(Step::Compile, success, InstanceState::Compiled)?;
        Ok(success)
    }

    /// Run the registered tests. No registered tests is a success.
    pub fn test(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        info!(instance = %self.name, step = "test", "testing system instance");
        let build_dir = &self.resolved.build_dir;
        let listing = ctx
            .runner
            .capture(&cmake::list_tests(&ctx.tools.ctest, build_dir))
            .and_then(|out| cmake::parse_test_count(&ctx.tools.ctest, &out));

        let count = match listing {
            Ok(count) => count,
            Err(e) => {
                warn!(instance = %self.name, step = "test", error = %e, "cannot determine tests");
                stats.log_step(&self.name, StepRecord::tool_failure(Step::Test));
                self.lifecycle
                    .complete(Step::Test, false, InstanceState::Tested)?;
                return Ok(false);
            }
        };

        if count == 0 {
            info!(instance = %self.name, "no tests registered");
            stats.log_testsuite(&self.name, 0, None);
            self.lifecycle.transition(InstanceState::Tested)?;
            return Ok(true);
        }

        let code = self.execute(ctx, &cmake::run_tests(&ctx.tools.ctest, build_dir));
        stats.log_testsuite(&self.name, count, code);
        let success = code == Some(0);
        self.lifecycle
            .complete(Step::Test, success, InstanceState::Tested)?;
        Ok(success)
    }

    /// Install every configured component, stopping at the first failure.
    pub fn install(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        let components = self.resolved.settings.install.components();
        if components.is_empty() {
            info!(instance = %self.name, "installation disabled");
            self.lifecycle.transition(InstanceState::Installed)?;
            return Ok(true);
        }

        info!(instance = %self.name, step = "install", "installing system instance");
        let mut success = true;
        for component in &components {
            let invocation = cmake::install(
                &ctx.tools.cmake,
                &self.resolved.build_dir,
                component.as_deref(),
            );
            let code = self.execute(ctx, &invocation);
            stats.log_install(&self.name, code);
            if code != Some(0) {
                success = false;
                break;
            }
        }
        self.lifecycle
            .complete(Step::Install, success, InstanceState::Installed)?;
        Ok(success)
    }

    pub fn clean(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        info!(instance = %self.name, step = "clean", "cleaning system instance");
        let code = self.execute(ctx, &cmake::clean(&ctx.tools.cmake, &self.resolved.build_dir));
        stats.log_clean(&self.name, code);
        let success = code == Some(0);
        self.lifecycle
            .complete(Step::Clean, success, InstanceState::Cleaned)?;
        Ok(success)
    }

    /// configure, compile, test, install; stops at the first failing step
    pub fn build(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        Ok(self.configure(ctx, stats)?
            && self.compile(ctx, stats)?
            && self.test(ctx, stats)?
            && self.install(ctx, stats)?)
    }

    /// compile, test, install on an already configured tree
    pub fn rebuild(
        &mut self,
        ctx: &InstanceContext<'_>,
        stats: &mut ExecutionStatistics,
    ) -> SystemResult<bool> {
        Ok(self.compile(ctx, stats)? && self.test(ctx, stats)? && self.install(ctx, stats)?)
    }
}
