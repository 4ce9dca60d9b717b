//! C99 emitter.
//!
//! Every binary and unary operation is emitted inside its own
//! parentheses, so the output never depends on C operator precedence.
//! Both operands of `&&` and `||` are real subexpressions in the
//! output, which means C's own short-circuiting applies at runtime;
//! evaluation order is otherwise the source order.

use super::{CodeWriter, CodegenConfig};
use crate::sem::Type;
use crate::syntax::tree::{Expr, ExprKind, Function, Program, Stmt, UnaryOp};

pub fn emit(program: &Program, config: &CodegenConfig) -> String {
    let mut emitter = CEmitter {
        w: CodeWriter::new(if config.pretty_print { "    " } else { "" }),
    };
    emitter.program(program, config);
    emitter.w.finish()
}

fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::Int => "int",
        Type::Bool => "bool",
        Type::Void => "void",
    }
}

struct CEmitter {
    w: CodeWriter,
}

impl CEmitter {
    fn program(&mut self, program: &Program, config: &CodegenConfig) {
        if config.emit_comments {
            self.w.push("/* generated by mica */\n\n");
        }
        self.w.push("#include <stdio.h>\n");
        self.w.push("#include <stdbool.h>\n\n");

        // Forward declarations in source order.
        for function in &program.functions {
            let declaration = self.forward_declaration(function);
            self.w.push(&declaration);
        }
        self.w.blank();

        for function in &program.functions {
            self.function(function);
        }
    }

    fn forward_declaration(&self, function: &Function) -> String {
        let params = if function.params.is_empty() {
            "void".to_string()
        } else {
            function
                .params
                .iter()
                .map(|param| type_name(param.ty).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "{} {}({});\n",
            type_name(function.return_type),
            function.name,
            params
        )
    }

    fn function(&mut self, function: &Function) {
        let params = if function.params.is_empty() {
            "void".to_string()
        } else {
            function
                .params
                .iter()
                .map(|param| format!("{} {}", type_name(param.ty), param.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.w.push(&format!(
            "{} {}({}) ",
            type_name(function.return_type),
            function.name,
            params
        ));
        self.block(&function.body);
        self.w.blank();
    }

    /// Emits `{ ... }` assuming the caller already wrote any prefix on
    /// the current line.
    fn block(&mut self, stmt: &Stmt) {
        self.w.push("{\n");
        self.w.enter();
        if let Stmt::Block(statements) = stmt {
            for statement in statements {
                self.statement(statement);
            }
        }
        self.w.exit();
        self.w.push_indent();
        self.w.push("}\n");
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, ty, init } => {
                let line = format!("{} {} = {};", type_name(*ty), name, self.expression(init));
                self.w.line(&line);
            }
            Stmt::Assign { name, value } => {
                let line = format!("{} = {};", name, self.expression(value));
                self.w.line(&line);
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let head = format!("if ({}) ", self.expression(condition));
                self.w.push_indent();
                self.w.push(&head);
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.w.push_indent();
                    self.w.push("else ");
                    self.block(else_block);
                }
            }
            Stmt::While { condition, body } => {
                let head = format!("while ({}) ", self.expression(condition));
                self.w.push_indent();
                self.w.push(&head);
                self.block(body);
            }
            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    let line = format!("return {};", self.expression(expr));
                    self.w.line(&line);
                }
                None => self.w.line("return;"),
            },
            Stmt::Expr(expr) => {
                let line = format!("{};", self.expression(expr));
                self.w.line(&line);
            }
            Stmt::Block(_) => {
                self.w.push_indent();
                self.block(stmt);
            }
        }
    }

    fn expression(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::IntLiteral(value) => value.to_string(),
            ExprKind::BoolLiteral(true) => "1".to_string(),
            ExprKind::BoolLiteral(false) => "0".to_string(),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::Binary { op, left, right } => format!(
                "({} {} {})",
                self.expression(left),
                op.symbol(),
                self.expression(right)
            ),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => format!("!({})", self.expression(operand)),
            ExprKind::Call { callee, args } => {
                if callee == "print" {
                    let arg = args
                        .first()
                        .map(|arg| self.expression(arg))
                        .unwrap_or_default();
                    return format!("printf(\"%d\\n\", {})", arg);
                }
                let args = args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", callee, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sem;
    use crate::syntax::{parser, tokenizer::Tokenizer};
    use pretty_assertions::assert_eq;

    fn compile(source: &str, config: &CodegenConfig) -> String {
        let mut program = parser::parse(&Tokenizer::tokenize(source)).expect("parse failed");
        sem::check_program(&mut program).expect("check failed");
        emit(&program, config)
    }

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

    #[test]
    fn emits_factorial() {
        let output = compile(FACTORIAL, &CodegenConfig::default());

        assert!(output.starts_with("#include <stdio.h>\n#include <stdbool.h>\n"));
        assert!(output.contains("int factorial(int);\n"));
        assert!(output.contains("int main(void);\n"));
        assert!(output.contains("int factorial(int n) {"));
        assert!(output.contains("int result = 1;"));
        assert!(output.contains("while ((n > 1)) {"));
        assert!(output.contains("result = (result * n);"));
        assert!(output.contains("printf(\"%d\\n\", fact);"));
        assert!(output.contains("return 0;"));
    }

    #[test]
    fn empty_parameter_lists_become_void() {
        let output = compile("func main() : int { return 0; }", &CodegenConfig::default());
        assert!(output.contains("int main(void);"));
        assert!(output.contains("int main(void) {"));
    }

    #[test]
    fn expressions_are_fully_parenthesized() {
        let output = compile(
            "func main() : int { var x = 1 + 2 * 3; var b = !(x == 7) && true; return x; }",
            &CodegenConfig::default(),
        );
        assert!(output.contains("int x = (1 + (2 * 3));"));
        assert!(output.contains("bool b = (!((x == 7)) && 1);"));
    }

    #[test]
    fn if_else_lowering() {
        let output = compile(
            "func main() : int { if (1 < 2) { return 1; } else { return 2; } }",
            &CodegenConfig::default(),
        );
        assert!(output.contains("if ((1 < 2)) {"));
        assert!(output.contains("else {"));
    }

    #[test]
    fn header_comment_is_opt_in() {
        let without = compile("func main() : int { return 0; }", &CodegenConfig::default());
        assert!(!without.contains("generated by"));

        let config = CodegenConfig {
            emit_comments: true,
            ..CodegenConfig::default()
        };
        let with = compile("func main() : int { return 0; }", &config);
        assert!(with.starts_with("/* generated by mica */\n"));
    }

    #[test]
    fn pretty_output_indents_by_four_and_balances_braces() {
        let output = compile(FACTORIAL, &CodegenConfig::default());

        for line in output.lines() {
            let leading = line.len() - line.trim_start().len();
            assert_eq!(leading % 4, 0, "line {:?} has stray indentation", line);
        }
        let opens = output.matches('{').count();
        let closes = output.matches('}').count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn compact_output_drops_indentation() {
        let config = CodegenConfig {
            pretty_print: false,
            ..CodegenConfig::default()
        };
        let output = compile(FACTORIAL, &config);
        for line in output.lines() {
            assert_eq!(line, line.trim_start());
        }
    }

    #[test]
    fn golden_minimal_program() {
        let output = compile("func main() : int { print(42); return 0; }", &CodegenConfig::default());
        assert_eq!(
            output,
            "#include <stdio.h>\n\
             #include <stdbool.h>\n\
             \n\
             int main(void);\n\
             \n\
             int main(void) {\n\
             \x20\x20\x20\x20printf(\"%d\\n\", 42);\n\
             \x20\x20\x20\x20return 0;\n\
             }\n\
             \n"
        );
    }
}
