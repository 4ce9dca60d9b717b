//! Renders a syntax tree back to source text. Binary and unary
//! operands are fully parenthesized, so reparsing the output yields a
//! structurally identical tree.

use super::tree::{Expr, ExprKind, Function, Program, Stmt, UnaryOp};

pub fn print(program: &Program) -> String {
    let mut printer = SourcePrinter {
        out: String::new(),
        indent: 0,
    };
    for (i, function) in program.functions.iter().enumerate() {
        if i > 0 {
            printer.out.push('\n');
        }
        printer.function(function);
    }
    printer.out
}

struct SourcePrinter {
    out: String,
    indent: usize,
}

impl SourcePrinter {
    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn function(&mut self, function: &Function) {
        self.out.push_str("func ");
        self.out.push_str(&function.name);
        self.out.push('(');
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.name);
            self.out.push_str(": ");
            self.out.push_str(&param.ty.to_string());
        }
        self.out.push_str(") : ");
        self.out.push_str(&function.return_type.to_string());
        self.out.push(' ');
        self.block(&function.body);
    }

    fn block(&mut self, stmt: &Stmt) {
        self.out.push_str("{\n");
        self.indent += 1;
        if let Stmt::Block(statements) = stmt {
            for statement in statements {
                self.statement(statement);
            }
        }
        self.indent -= 1;
        self.push_indent();
        self.out.push_str("}\n");
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                self.push_indent();
                self.out.push_str("var ");
                self.out.push_str(name);
                self.out.push_str(" = ");
                self.expression(init);
                self.out.push_str(";\n");
            }
            Stmt::Assign { name, value } => {
                self.push_indent();
                self.out.push_str(name);
                self.out.push_str(" = ");
                self.expression(value);
                self.out.push_str(";\n");
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                self.push_indent();
                self.out.push_str("if (");
                self.expression(condition);
                self.out.push_str(") ");
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.push_indent();
                    self.out.push_str("else ");
                    self.block(else_block);
                }
            }
            Stmt::While { condition, body } => {
                self.push_indent();
                self.out.push_str("while (");
                self.expression(condition);
                self.out.push_str(") ");
                self.block(body);
            }
            Stmt::Return(expr) => {
                self.push_indent();
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    self.expression(expr);
                }
                self.out.push_str(";\n");
            }
            Stmt::Expr(expr) => {
                self.push_indent();
                self.expression(expr);
                self.out.push_str(";\n");
            }
            Stmt::Block(_) => {
                self.push_indent();
                self.block(stmt);
            }
        }
    }

    fn expression(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntLiteral(value) => self.out.push_str(&value.to_string()),
            ExprKind::BoolLiteral(true) => self.out.push_str("true"),
            ExprKind::BoolLiteral(false) => self.out.push_str("false"),
            ExprKind::Variable(name) => self.out.push_str(name),
            ExprKind::Binary { op, left, right } => {
                self.out.push('(');
                self.expression(left);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.expression(right);
                self.out.push(')');
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                self.out.push('!');
                self.out.push('(');
                self.expression(operand);
                self.out.push(')');
            }
            ExprKind::Call { callee, args } => {
                self.out.push_str(callee);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expression(arg);
                }
                self.out.push(')');
            }
        }
    }
}
