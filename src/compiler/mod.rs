//! High-level compile API: assembles the four stages into a pipeline,
//! executes it, and collects the generated code plus run statistics.

pub mod cli;
pub mod stages;

use std::io;
use std::sync::PoisonError;

use thiserror::Error;

pub use cli::Command;

use crate::emit::CodegenConfig;
use crate::pipeline::middleware::{LoggingMiddleware, MemoryMonitorMiddleware, TimingMiddleware};
use crate::pipeline::{ErrorCode, ErrorDetail, FaultTolerance, Pipeline, PipelineOutcome, Value};
use stages::{
    CheckStage, CodegenStage, LexStage, ParseStage, KEY_AST, KEY_OUTPUT_CODE, KEY_SOURCE_TEXT,
    KEY_TOKENS,
};

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    InputSource(#[from] io::Error),

    #[error("pipeline setup failed: {0}")]
    Setup(#[from] ErrorCode),

    #[error("{0}")]
    Failed(String),
}

impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InvalidOption(message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub codegen: CodegenConfig,
    pub fault_tolerance: FaultTolerance,
    pub error_detail: ErrorDetail,
    /// Install the logging and memory observers.
    pub log_stages: bool,
    /// Install the per-stage timing observer.
    pub timings: bool,
}

/// The result of one pipeline run over one source text.
#[derive(Debug)]
pub struct Compilation {
    /// Generated code; absent when the run failed.
    pub output: Option<String>,
    pub outcome: PipelineOutcome,
    pub token_count: usize,
    pub ast_node_count: usize,
    pub memory_used: usize,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded && self.output.is_some()
    }
}

/// Builds the standard four-stage pipeline for `options`. The caller
/// may install additional middleware before executing.
pub fn build_pipeline(options: &CompileOptions) -> Result<Pipeline, ErrorCode> {
    let mut pipeline = Pipeline::with_detail(options.fault_tolerance, options.error_detail);
    if options.log_stages {
        pipeline.use_middleware(Box::new(LoggingMiddleware))?;
        pipeline.use_middleware(Box::new(MemoryMonitorMiddleware))?;
    }
    if options.timings {
        pipeline.use_middleware(Box::new(TimingMiddleware))?;
    }
    pipeline.add_stage(Box::new(LexStage))?;
    pipeline.add_stage(Box::new(ParseStage))?;
    pipeline.add_stage(Box::new(CheckStage))?;
    pipeline.add_stage(Box::new(CodegenStage {
        config: options.codegen.clone(),
    }))?;
    Ok(pipeline)
}

pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation, CompilerError> {
    let pipeline = build_pipeline(options)?;
    pipeline
        .context()
        .set(KEY_SOURCE_TEXT, Value::Source(source.to_string()))?;

    let outcome = pipeline.execute();

    let context = pipeline.context();
    let output = if outcome.succeeded {
        context
            .get(KEY_OUTPUT_CODE)
            .and_then(|value| value.as_code().map(str::to_string))
    } else {
        None
    };
    let token_count = context
        .get(KEY_TOKENS)
        .and_then(|value| value.as_tokens().map(|tokens| tokens.len()))
        .unwrap_or(0);
    let ast_node_count = context
        .get(KEY_AST)
        .and_then(|value| {
            value.program().map(|program| {
                program
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .node_count()
            })
        })
        .unwrap_or(0);
    let memory_used = context.memory_usage();

    Ok(Compilation {
        output,
        outcome,
        token_count,
        ast_node_count,
        memory_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Target;
    use crate::pipeline::ErrorCode;

    const FACTORIAL: &str = "func factorial(n: int) : int { \
                               var result = 1; \
                               while (n > 1) { result = result * n; n = n - 1; } \
                               return result; \
                             } \
                             func main() : int { \
                               var x = 5; \
                               var fact = factorial(x); \
                               print(fact); \
                               return 0; \
                             }";

    fn options_for(target: Target) -> CompileOptions {
        CompileOptions {
            codegen: CodegenConfig {
                target,
                ..CodegenConfig::default()
            },
            ..CompileOptions::default()
        }
    }

    fn first_failure(compilation: &Compilation) -> (&str, ErrorCode, &str) {
        let failure = &compilation.outcome.failures[0];
        (failure.stage.as_str(), failure.code, failure.message.as_str())
    }

    #[test]
    fn factorial_compiles_to_c() {
        let compilation = compile(FACTORIAL, &options_for(Target::C)).unwrap();

        assert!(compilation.succeeded());
        assert!(compilation.outcome.failures.is_empty());
        let output = compilation.output.unwrap();
        assert!(output.contains("int factorial(int n) {"));
        assert!(output.contains("printf(\"%d\\n\", fact);"));

        assert!(compilation.token_count > 0);
        assert!(compilation.ast_node_count > 0);
        assert!(compilation.memory_used > 0);
    }

    #[test]
    fn factorial_compiles_to_ir() {
        let compilation = compile(FACTORIAL, &options_for(Target::Ir)).unwrap();

        assert!(compilation.succeeded());
        let output = compilation.output.unwrap();
        assert!(output.contains("define i32 @factorial(i32 %n.param)"));
        assert!(output.contains("icmp gt"));
        assert!(output.contains("br i1"));
    }

    #[test]
    fn type_error_fails_at_the_type_checker() {
        let compilation =
            compile("func main() : int { var x = true + 1; return 0; }", &CompileOptions::default())
                .unwrap();

        assert!(!compilation.succeeded());
        assert!(compilation.output.is_none());
        let (stage, code, message) = first_failure(&compilation);
        assert_eq!(stage, "type-checker");
        assert_eq!(code, ErrorCode::InvalidInput);
        assert!(message.contains("Arithmetic operator requires int"));
    }

    #[test]
    fn undefined_variable_fails_at_the_type_checker() {
        let compilation =
            compile("func main() : int { return y; }", &CompileOptions::default()).unwrap();

        let (stage, _, message) = first_failure(&compilation);
        assert_eq!(stage, "type-checker");
        assert!(message.contains("Undefined variable 'y'"));
    }

    #[test]
    fn return_mismatch_fails_at_the_type_checker() {
        let compilation = compile(
            "func f() : bool { return 1; } func main() : int { return 0; }",
            &CompileOptions::default(),
        )
        .unwrap();

        let (stage, _, message) = first_failure(&compilation);
        assert_eq!(stage, "type-checker");
        assert!(message.contains("Return type mismatch"));
    }

    #[test]
    fn missing_semicolon_fails_at_the_parser() {
        let compilation = compile(
            "func main() : int { var x = 1 return x; }",
            &CompileOptions::default(),
        )
        .unwrap();

        let (stage, code, message) = first_failure(&compilation);
        assert_eq!(stage, "parser");
        assert_eq!(code, ErrorCode::InvalidInput);
        assert!(message.contains("Expected ';' after variable declaration"));
        assert!(message.contains("line 1, column 31"));
        assert!(message.contains("Got 'return'"));
    }

    #[test]
    fn empty_program_fails_at_the_parser() {
        let compilation = compile("   \n\n", &CompileOptions::default()).unwrap();

        assert!(!compilation.succeeded());
        let (stage, _, message) = first_failure(&compilation);
        assert_eq!(stage, "parser");
        assert!(message.contains("Program must contain at least one function"));
    }

    #[test]
    fn lexer_failure_stops_the_strict_pipeline() {
        let compilation = compile("func main() : int { return 0; } $", &CompileOptions::default())
            .unwrap();

        assert!(!compilation.succeeded());
        assert_eq!(compilation.outcome.failures.len(), 1);
        let (stage, _, message) = first_failure(&compilation);
        assert_eq!(stage, "lexer");
        assert!(message.contains("unexpected character '$'"));
    }

    #[test]
    fn lenient_mode_reports_cascading_failures() {
        let options = CompileOptions {
            fault_tolerance: FaultTolerance::Lenient,
            ..CompileOptions::default()
        };
        let compilation = compile("$", &options).unwrap();

        assert!(!compilation.succeeded());
        // Lexer fails, then parser and checker fail on missing inputs,
        // then codegen fails on the missing tree.
        assert_eq!(compilation.outcome.failures.len(), 4);
        assert_eq!(compilation.outcome.failures[1].code, ErrorCode::NullInput);
    }

    #[test]
    fn minimal_detail_hides_messages() {
        let options = CompileOptions {
            error_detail: ErrorDetail::Minimal,
            ..CompileOptions::default()
        };
        let compilation = compile("func main() : int { return y; }", &options).unwrap();

        let (_, _, message) = first_failure(&compilation);
        assert_eq!(message, "Error code: 2");
    }

    #[test]
    fn executing_the_same_pipeline_twice_is_idempotent() {
        let options = options_for(Target::C);
        let pipeline = build_pipeline(&options).unwrap();
        pipeline
            .context()
            .set(KEY_SOURCE_TEXT, Value::Source(FACTORIAL.to_string()))
            .unwrap();

        let first = pipeline.execute();
        let first_output = pipeline
            .context()
            .get(KEY_OUTPUT_CODE)
            .and_then(|value| value.as_code().map(str::to_string));

        let second = pipeline.execute();
        let second_output = pipeline
            .context()
            .get(KEY_OUTPUT_CODE)
            .and_then(|value| value.as_code().map(str::to_string));

        assert!(first.succeeded);
        assert!(second.succeeded);
        assert_eq!(first_output, second_output);
    }

    #[test]
    fn observers_leave_results_untouched() {
        let options = CompileOptions {
            log_stages: true,
            timings: true,
            ..options_for(Target::Ir)
        };
        let compilation = compile(FACTORIAL, &options).unwrap();

        assert!(compilation.succeeded());
        assert!(compilation
            .output
            .unwrap()
            .contains("define i32 @factorial(i32 %n.param)"));
    }
}
