use std::fs;
use std::io::{self, Read};

use clap::Parser;

use super::{compile, CompileOptions, CompilerError};
use crate::emit::{CodegenConfig, Target};

/// Command-line front end: reads Mica source from a file or stdin and
/// writes the generated code to stdout.
#[derive(Debug, Parser)]
#[command(name = "mica", version, about = "Compiler for the Mica language")]
pub struct Command {
    /// Input file; reads stdin when omitted
    input: Option<String>,

    /// Output target ("c" or "ir")
    #[arg(long, default_value = "c")]
    target: String,

    /// Emit a header comment at the top of the output
    #[arg(long)]
    emit_comments: bool,

    /// Minimal output without indentation
    #[arg(long)]
    compact: bool,

    /// Log wall-clock time per stage
    #[arg(long)]
    timings: bool,

    /// Log stage entry, exit, and memory usage
    #[arg(long, short)]
    verbose: bool,
}

impl Command {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> Result<String, CompilerError> {
        let target: Target = self.target.parse().map_err(CompilerError::InvalidOption)?;

        let source = match &self.input {
            Some(path) => fs::read_to_string(path)?,
            None => read_from_stdin()?,
        };

        let options = CompileOptions {
            codegen: CodegenConfig {
                target,
                emit_comments: self.emit_comments,
                pretty_print: !self.compact,
            },
            log_stages: self.verbose,
            timings: self.timings,
            ..CompileOptions::default()
        };

        let compilation = compile(&source, &options)?;
        match compilation.output {
            Some(output) if compilation.outcome.succeeded => Ok(output),
            _ => {
                let report = compilation
                    .outcome
                    .failures
                    .iter()
                    .map(|failure| format!("{}: {}", failure.stage, failure.message))
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(CompilerError::Failed(report))
            }
        }
    }
}

fn read_from_stdin() -> io::Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}
