//! The stage pipeline engine.
//!
//! A [`Pipeline`] runs an ordered list of [`Stage`]s left to right, each
//! wrapped by the installed [`Middleware`] stack outermost first: with
//! middleware `M1, M2, M3`, a stage `S` runs as `M1(M2(M3(S)))`. Stages
//! exchange data only through the shared [`Context`]; a selectable
//! fault-tolerance policy decides whether a failing stage halts the run.

pub mod context;
pub mod errors;
pub mod middleware;

use std::sync::atomic::{AtomicBool, Ordering};

pub use context::{Context, ContextLimits, Value};
pub use errors::{ErrorCode, ErrorDetail, StageError, StageResult};

use errors::sanitize_message;

pub const MAX_STAGES: usize = 1024;
pub const MAX_MIDDLEWARE: usize = 16;
pub const MAX_NAME_LENGTH: usize = 256;

/// A named, synchronous unit of work over the context.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, context: &Context) -> StageResult;
}

/// An interceptor wrapping every stage. A middleware may observe the
/// context before running its continuation, skip the continuation
/// entirely and substitute any outcome, or rewrite the outcome after the
/// continuation returns.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;
    fn handle(&self, stage_name: &str, context: &Context, next: Next<'_>) -> StageResult;
}

/// Continuation handle passed to middleware. Running it consumes it, so
/// a middleware cannot invoke the rest of the onion twice.
pub struct Next<'a> {
    pipeline: &'a Pipeline,
    stage: &'a dyn Stage,
    index: usize,
}

impl Next<'_> {
    pub fn run(self) -> StageResult {
        self.pipeline.dispatch(self.stage, self.index)
    }
}

/// Policy applied when a stage yields a failing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultTolerance {
    /// Record the failure and stop.
    #[default]
    Strict,
    /// Record the failure and continue; the run still counts as failed.
    Lenient,
    /// Record the failure and continue; stage failures alone do not fail
    /// the run.
    BestEffort,
    /// Ask the installed failure handler whether to continue.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    Continue,
    Abort,
}

pub type FailureHandler = Box<dyn Fn(&str, &StageError) -> FailureDisposition + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: String,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub succeeded: bool,
    pub failures: Vec<StageFailure>,
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    middlewares: Vec<Box<dyn Middleware>>,
    context: Context,
    fault_tolerance: FaultTolerance,
    error_detail: ErrorDetail,
    failure_handler: Option<FailureHandler>,
    executing: AtomicBool,
    interrupted: AtomicBool,
}

impl Pipeline {
    pub fn new(fault_tolerance: FaultTolerance) -> Self {
        Self::with_detail(fault_tolerance, ErrorDetail::Full)
    }

    pub fn with_detail(fault_tolerance: FaultTolerance, error_detail: ErrorDetail) -> Self {
        Self {
            stages: Vec::new(),
            middlewares: Vec::new(),
            context: Context::new(),
            fault_tolerance,
            error_detail,
            failure_handler: None,
            executing: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) -> Result<(), ErrorCode> {
        if self.executing.load(Ordering::SeqCst) {
            return Err(ErrorCode::Reentrancy);
        }
        if stage.name().len() > MAX_NAME_LENGTH {
            return Err(ErrorCode::NameTooLong);
        }
        if self.stages.len() >= MAX_STAGES {
            return Err(ErrorCode::CapacityExceeded);
        }
        self.stages.push(stage);
        Ok(())
    }

    /// Installs a middleware. Installation order is wrapping order: the
    /// first installed middleware is the outermost layer.
    pub fn use_middleware(&mut self, middleware: Box<dyn Middleware>) -> Result<(), ErrorCode> {
        if self.executing.load(Ordering::SeqCst) {
            return Err(ErrorCode::Reentrancy);
        }
        if middleware.name().len() > MAX_NAME_LENGTH {
            return Err(ErrorCode::NameTooLong);
        }
        if self.middlewares.len() >= MAX_MIDDLEWARE {
            return Err(ErrorCode::CapacityExceeded);
        }
        self.middlewares.push(middleware);
        Ok(())
    }

    /// Installs the policy callback consulted in `Custom` mode.
    pub fn set_failure_handler(&mut self, handler: FailureHandler) {
        self.failure_handler = Some(handler);
    }

    /// Advisory stop signal. `execute` checks it between stages and
    /// winds down cleanly.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Runs every stage under the middleware stack. Overlapping calls on
    /// the same pipeline are rejected: the loser reports `Reentrancy`
    /// without running any stage.
    pub fn execute(&self) -> PipelineOutcome {
        if self
            .executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return PipelineOutcome {
                succeeded: false,
                failures: vec![StageFailure {
                    stage: "pipeline".to_string(),
                    code: ErrorCode::Reentrancy,
                    message: sanitize_message(
                        "Pipeline is already executing",
                        ErrorCode::Reentrancy,
                        self.error_detail,
                    ),
                }],
            };
        }
        let _guard = ExecutionGuard(&self.executing);

        let mut failures = Vec::new();
        let mut aborted = false;

        for stage in &self.stages {
            if self.interrupted.load(Ordering::SeqCst) {
                break;
            }
            if let Err(error) = self.dispatch(stage.as_ref(), 0) {
                let disposition = match self.fault_tolerance {
                    FaultTolerance::Strict => FailureDisposition::Abort,
                    FaultTolerance::Lenient | FaultTolerance::BestEffort => {
                        FailureDisposition::Continue
                    }
                    FaultTolerance::Custom => self
                        .failure_handler
                        .as_ref()
                        .map(|handler| handler(stage.name(), &error))
                        .unwrap_or(FailureDisposition::Abort),
                };
                failures.push(StageFailure {
                    stage: stage.name().to_string(),
                    code: error.code,
                    message: sanitize_message(&error.message, error.code, self.error_detail),
                });
                if disposition == FailureDisposition::Abort {
                    aborted = true;
                    break;
                }
            }
        }

        let succeeded = !aborted
            && (failures.is_empty() || self.fault_tolerance == FaultTolerance::BestEffort);
        PipelineOutcome {
            succeeded,
            failures,
        }
    }

    fn dispatch(&self, stage: &dyn Stage, index: usize) -> StageResult {
        match self.middlewares.get(index) {
            Some(middleware) => middleware.handle(
                stage.name(),
                &self.context,
                Next {
                    pipeline: self,
                    stage,
                    index: index + 1,
                },
            ),
            None => stage.run(&self.context),
        }
    }
}

/// Clears the executing flag on every exit path, panics included.
struct ExecutionGuard<'a>(&'a AtomicBool);

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
