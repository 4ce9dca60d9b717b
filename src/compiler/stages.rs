//! The four compiler stages. Each consumes and produces context
//! entries under the well-known keys; stages never call each other.

use std::sync::{Mutex, PoisonError};

use crate::emit::{self, CodegenConfig};
use crate::pipeline::{Context, ErrorCode, Stage, StageError, StageResult, Value};
use crate::sem;
use crate::syntax::{parser, Tokenizer};

pub const KEY_SOURCE_TEXT: &str = "source_text";
pub const KEY_TOKENS: &str = "tokens";
pub const KEY_AST: &str = "ast";
pub const KEY_AST_TYPED: &str = "ast_typed";
pub const KEY_OUTPUT_CODE: &str = "output_code";

fn store_error(code: ErrorCode, what: &str) -> StageError {
    StageError::new(code, format!("Failed to store {} in context", what))
}

/// `source_text` -> `tokens`.
pub struct LexStage;

impl Stage for LexStage {
    fn name(&self) -> &str {
        "lexer"
    }

    fn run(&self, context: &Context) -> StageResult {
        let source = context
            .get(KEY_SOURCE_TEXT)
            .ok_or_else(|| StageError::new(ErrorCode::NullInput, "No source text provided"))?;
        let source = source
            .as_source()
            .ok_or_else(|| StageError::new(ErrorCode::NullInput, "No source text provided"))?;

        let tokens = Tokenizer::tokenize(source);
        if let Some(token) = tokens.first_error() {
            return Err(StageError::new(
                ErrorCode::InvalidInput,
                format!(
                    "Lexer error at line {}, column {}: unexpected character '{}'",
                    token.line, token.column, token.kind
                ),
            ));
        }

        context
            .set(KEY_TOKENS, Value::Tokens(tokens))
            .map_err(|code| store_error(code, "tokens"))?;
        Ok(())
    }
}

/// `tokens` -> `ast`.
pub struct ParseStage;

impl Stage for ParseStage {
    fn name(&self) -> &str {
        "parser"
    }

    fn run(&self, context: &Context) -> StageResult {
        let tokens = context
            .get(KEY_TOKENS)
            .ok_or_else(|| StageError::new(ErrorCode::NullInput, "No tokens provided to parser"))?;
        let tokens = tokens
            .as_tokens()
            .ok_or_else(|| StageError::new(ErrorCode::NullInput, "No tokens provided to parser"))?;

        let program = parser::parse(tokens).map_err(|error| {
            StageError::new(ErrorCode::InvalidInput, format!("Parser failed: {}", error))
        })?;

        context
            .set(KEY_AST, Value::Program(Mutex::new(program)))
            .map_err(|code| store_error(code, "AST"))?;
        Ok(())
    }
}

/// Annotates `ast` in place and publishes `ast_typed`.
pub struct CheckStage;

impl Stage for CheckStage {
    fn name(&self) -> &str {
        "type-checker"
    }

    fn run(&self, context: &Context) -> StageResult {
        let ast = context.get(KEY_AST).ok_or_else(|| {
            StageError::new(ErrorCode::NullInput, "No AST provided to type checker")
        })?;
        let program = ast.program().ok_or_else(|| {
            StageError::new(ErrorCode::NullInput, "No AST provided to type checker")
        })?;

        {
            let mut program = program.lock().unwrap_or_else(PoisonError::into_inner);
            sem::check_program(&mut program).map_err(|error| {
                StageError::new(
                    ErrorCode::InvalidInput,
                    format!("Type checking failed: {}", error),
                )
            })?;
        }

        context
            .set(KEY_AST_TYPED, Value::Flag(true))
            .map_err(|code| store_error(code, "typed flag"))?;
        Ok(())
    }
}

/// Typed `ast` + configuration -> `output_code`.
pub struct CodegenStage {
    pub config: CodegenConfig,
}

impl Stage for CodegenStage {
    fn name(&self) -> &str {
        "codegen"
    }

    fn run(&self, context: &Context) -> StageResult {
        let ast = context.get(KEY_AST).ok_or_else(|| {
            StageError::new(ErrorCode::NullInput, "No AST provided to code generator")
        })?;
        let program = ast.program().ok_or_else(|| {
            StageError::new(ErrorCode::NullInput, "No AST provided to code generator")
        })?;

        let output = {
            let program = program.lock().unwrap_or_else(PoisonError::into_inner);
            emit::generate(&program, &self.config)
        };

        context
            .set(KEY_OUTPUT_CODE, Value::Code(output))
            .map_err(|code| store_error(code, "output code"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer_requires_source_text() {
        let context = Context::new();
        let error = LexStage.run(&context).unwrap_err();
        assert_eq!(error.code, ErrorCode::NullInput);
        assert_eq!(error.message, "No source text provided");
    }

    #[test]
    fn lexer_reports_the_first_bad_character() {
        let context = Context::new();
        context
            .set(KEY_SOURCE_TEXT, Value::Source("var x = 1 @ 2;".to_string()))
            .unwrap();

        let error = LexStage.run(&context).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidInput);
        assert_eq!(
            error.message,
            "Lexer error at line 1, column 11: unexpected character '@'"
        );
        assert!(context.get(KEY_TOKENS).is_none());
    }

    #[test]
    fn parser_requires_tokens() {
        let context = Context::new();
        let error = ParseStage.run(&context).unwrap_err();
        assert_eq!(error.code, ErrorCode::NullInput);
        assert_eq!(error.message, "No tokens provided to parser");
    }

    #[test]
    fn checker_requires_ast() {
        let context = Context::new();
        let error = CheckStage.run(&context).unwrap_err();
        assert_eq!(error.code, ErrorCode::NullInput);
        assert_eq!(error.message, "No AST provided to type checker");
    }

    #[test]
    fn stages_chain_through_the_context() {
        let context = Context::new();
        context
            .set(
                KEY_SOURCE_TEXT,
                Value::Source("func main() : int { return 0; }".to_string()),
            )
            .unwrap();

        LexStage.run(&context).unwrap();
        assert!(context.get(KEY_TOKENS).is_some());

        ParseStage.run(&context).unwrap();
        assert!(context.get(KEY_AST).is_some());

        CheckStage.run(&context).unwrap();
        assert_eq!(
            context.get(KEY_AST_TYPED).and_then(|v| v.as_flag()),
            Some(true)
        );

        CodegenStage {
            config: CodegenConfig::default(),
        }
        .run(&context)
        .unwrap();
        let output = context.get(KEY_OUTPUT_CODE).unwrap();
        assert!(output.as_code().unwrap().contains("int main(void)"));
    }
}
