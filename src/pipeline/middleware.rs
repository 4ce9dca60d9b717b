//! Built-in observer middleware.
//!
//! These cover the cross-cutting concerns the engine itself stays out
//! of: logging, timing, memory accounting, resource limiting, and fault
//! injection for resilience testing. All of them report through the
//! `log` facade; the host decides where records go.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{info, warn};

use super::errors::{ErrorCode, StageError, StageResult};
use super::{Context, Middleware, Next};

/// Logs stage entry and exit together with the context entry count.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn handle(&self, stage_name: &str, context: &Context, next: Next<'_>) -> StageResult {
        info!("entering {} ({} context entries)", stage_name, context.count());
        let result = next.run();
        match &result {
            Ok(()) => info!("completed {}", stage_name),
            Err(error) => info!("completed {} with failure: {}", stage_name, error),
        }
        result
    }
}

/// Logs wall-clock time per stage.
pub struct TimingMiddleware;

impl Middleware for TimingMiddleware {
    fn name(&self) -> &str {
        "timing"
    }

    fn handle(&self, stage_name: &str, _context: &Context, next: Next<'_>) -> StageResult {
        let start = Instant::now();
        let result = next.run();
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        info!("{} took {:.3} ms", stage_name, elapsed);
        result
    }
}

/// Logs the context memory delta each stage causes.
pub struct MemoryMonitorMiddleware;

impl Middleware for MemoryMonitorMiddleware {
    fn name(&self) -> &str {
        "memory-monitor"
    }

    fn handle(&self, stage_name: &str, context: &Context, next: Next<'_>) -> StageResult {
        let before = context.memory_usage();
        let result = next.run();
        let after = context.memory_usage();
        let delta = after as i64 - before as i64;
        info!("{}: {:+} bytes (total {} bytes)", stage_name, delta, after);
        result
    }
}

/// Refuses to run a stage once tracked context memory exceeds the
/// configured budget.
pub struct ResourceLimitMiddleware {
    pub max_memory_bytes: usize,
}

impl Middleware for ResourceLimitMiddleware {
    fn name(&self) -> &str {
        "resource-limit"
    }

    fn handle(&self, stage_name: &str, context: &Context, next: Next<'_>) -> StageResult {
        let current = context.memory_usage();
        if current > self.max_memory_bytes {
            warn!(
                "memory limit exceeded before {}: {} > {} bytes",
                stage_name, current, self.max_memory_bytes
            );
            return Err(StageError::new(
                ErrorCode::MemoryLimitExceeded,
                "Memory limit exceeded",
            ));
        }

        let result = next.run();

        let current = context.memory_usage();
        if current > self.max_memory_bytes {
            warn!(
                "memory limit exceeded after {}: {} > {} bytes",
                stage_name, current, self.max_memory_bytes
            );
        }
        result
    }
}

/// Deterministically injects stage failures at a configurable rate.
/// Meant for exercising fault-tolerance policies, not production runs.
pub struct FaultInjectionMiddleware {
    failure_rate: f64,
    state: AtomicU64,
}

impl FaultInjectionMiddleware {
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        Self {
            failure_rate,
            state: AtomicU64::new(seed.max(1)),
        }
    }

    // xorshift64; reproducible for a fixed seed.
    fn roll(&self) -> f64 {
        let step = |mut x: u64| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        };
        let previous = match self.state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| {
            Some(step(x))
        }) {
            Ok(value) | Err(value) => value,
        };
        (step(previous) >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl Middleware for FaultInjectionMiddleware {
    fn name(&self) -> &str {
        "fault-injection"
    }

    fn handle(&self, stage_name: &str, _context: &Context, next: Next<'_>) -> StageResult {
        if self.roll() < self.failure_rate {
            warn!("injecting failure into {}", stage_name);
            return Err(StageError::new(ErrorCode::InvalidInput, "Injected failure"));
        }
        next.run()
    }
}
