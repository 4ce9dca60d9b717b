//! Textual IR emitter.
//!
//! The output is SSA-like: every intermediate value lands in a fresh
//! `%tN` temporary, source variables live in `%name` slots accessed
//! through load/store, and control flow lowers to labeled blocks with
//! explicit branches. Parameters are spilled in the prologue
//! (`%p = alloca i32` then `store i32 %p.param, %p`) so parameter and
//! local access share one convention. `&&` and `||` evaluate both
//! operands; there is no short-circuit lowering.

use super::{CodeWriter, CodegenConfig};
use crate::sem::Type;
use crate::syntax::tree::{BinaryOp, Expr, ExprKind, Function, Program, Stmt, UnaryOp};

pub fn emit(program: &Program, config: &CodegenConfig) -> String {
    let mut emitter = IrEmitter {
        w: CodeWriter::new(if config.pretty_print { "  " } else { "" }),
        temp_count: 0,
        label_count: 0,
    };
    emitter.program(program, config);
    emitter.w.finish()
}

fn ir_type(ty: Type) -> &'static str {
    match ty {
        Type::Int => "i32",
        Type::Bool => "i1",
        Type::Void => "void",
    }
}

struct IrEmitter {
    w: CodeWriter,
    // Both counters run for the whole generation, not per function.
    temp_count: usize,
    label_count: usize,
}

impl IrEmitter {
    fn next_temp(&mut self) -> String {
        self.temp_count += 1;
        format!("%t{}", self.temp_count - 1)
    }

    fn next_label(&mut self) -> String {
        self.label_count += 1;
        format!("L{}", self.label_count - 1)
    }

    fn program(&mut self, program: &Program, config: &CodegenConfig) {
        if config.emit_comments {
            self.w.push("; generated by mica\n; target: ir\n\n");
        }
        self.w.push("declare void @print(i32)\n\n");
        for function in &program.functions {
            self.function(function);
        }
    }

    fn function(&mut self, function: &Function) {
        let params = function
            .params
            .iter()
            .map(|param| format!("{} %{}.param", ir_type(param.ty), param.name))
            .collect::<Vec<_>>()
            .join(", ");
        self.w.push(&format!(
            "define {} @{}({}) {{\n",
            ir_type(function.return_type),
            function.name,
            params
        ));
        self.w.push("entry:\n");
        self.w.enter();

        for param in &function.params {
            let slot = format!("%{} = alloca i32", param.name);
            self.w.line(&slot);
            let spill = format!("store i32 %{}.param, %{}", param.name, param.name);
            self.w.line(&spill);
        }

        self.statement(&function.body);

        self.w.exit();
        self.w.push("}\n\n");
    }

    fn label(&mut self, name: &str) {
        self.w.blank();
        self.w.push(name);
        self.w.push(":\n");
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let slot = format!("%{} = alloca i32", name);
                self.w.line(&slot);
                let value = self.expression(init);
                let store = format!("store i32 {}, %{}", value, name);
                self.w.line(&store);
            }
            Stmt::Assign { name, value } => {
                let value = self.expression(value);
                let store = format!("store i32 {}, %{}", value, name);
                self.w.line(&store);
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond = self.expression(condition);
                let then_label = self.next_label();
                let else_label = else_block.as_ref().map(|_| self.next_label());
                let end_label = self.next_label();

                let branch_target = else_label.as_deref().unwrap_or(&end_label);
                let branch = format!(
                    "br i1 {}, label %{}, label %{}",
                    cond, then_label, branch_target
                );
                self.w.line(&branch);

                self.label(&then_label);
                self.statement(then_block);
                let jump_end = format!("br label %{}", end_label);
                self.w.line(&jump_end);

                if let (Some(else_label), Some(else_block)) = (&else_label, else_block) {
                    self.label(else_label);
                    self.statement(else_block);
                    let jump_end = format!("br label %{}", end_label);
                    self.w.line(&jump_end);
                }

                self.label(&end_label);
            }
            Stmt::While { condition, body } => {
                let cond_label = self.next_label();
                let body_label = self.next_label();
                let end_label = self.next_label();

                let jump_cond = format!("br label %{}", cond_label);
                self.w.line(&jump_cond);

                self.label(&cond_label);
                let cond = self.expression(condition);
                let branch = format!(
                    "br i1 {}, label %{}, label %{}",
                    cond, body_label, end_label
                );
                self.w.line(&branch);

                self.label(&body_label);
                self.statement(body);
                let jump_back = format!("br label %{}", cond_label);
                self.w.line(&jump_back);

                self.label(&end_label);
            }
            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    let value = self.expression(expr);
                    let ret = format!("ret i32 {}", value);
                    self.w.line(&ret);
                }
                None => self.w.line("ret void"),
            },
            Stmt::Expr(expr) => {
                self.expression(expr);
            }
            Stmt::Block(statements) => {
                for statement in statements {
                    self.statement(statement);
                }
            }
        }
    }

    /// Emits the instructions computing `expr` and returns the name of
    /// the temporary holding the result.
    fn expression(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                let temp = self.next_temp();
                let instr = format!("{} = const i32 {}", temp, value);
                self.w.line(&instr);
                temp
            }
            ExprKind::BoolLiteral(value) => {
                let temp = self.next_temp();
                let instr = format!("{} = const i1 {}", temp, i32::from(*value));
                self.w.line(&instr);
                temp
            }
            ExprKind::Variable(name) => {
                let temp = self.next_temp();
                let instr = format!("{} = load %{}", temp, name);
                self.w.line(&instr);
                temp
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.expression(left);
                let right = self.expression(right);
                let temp = self.next_temp();
                let instr = match op {
                    BinaryOp::Add => format!("{} = add i32 {}, {}", temp, left, right),
                    BinaryOp::Sub => format!("{} = sub i32 {}, {}", temp, left, right),
                    BinaryOp::Mul => format!("{} = mul i32 {}, {}", temp, left, right),
                    BinaryOp::Div => format!("{} = div i32 {}, {}", temp, left, right),
                    BinaryOp::Mod => format!("{} = mod i32 {}, {}", temp, left, right),
                    BinaryOp::Eq => format!("{} = icmp eq i32 {}, {}", temp, left, right),
                    BinaryOp::Ne => format!("{} = icmp ne i32 {}, {}", temp, left, right),
                    BinaryOp::Lt => format!("{} = icmp lt i32 {}, {}", temp, left, right),
                    BinaryOp::Le => format!("{} = icmp le i32 {}, {}", temp, left, right),
                    BinaryOp::Gt => format!("{} = icmp gt i32 {}, {}", temp, left, right),
                    BinaryOp::Ge => format!("{} = icmp ge i32 {}, {}", temp, left, right),
                    BinaryOp::And => format!("{} = and i1 {}, {}", temp, left, right),
                    BinaryOp::Or => format!("{} = or i1 {}, {}", temp, left, right),
                };
                self.w.line(&instr);
                temp
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let operand = self.expression(operand);
                let temp = self.next_temp();
                let instr = format!("{} = xor i1 {}, 1", temp, operand);
                self.w.line(&instr);
                temp
            }
            ExprKind::Call { callee, args } => {
                if callee == "print" {
                    let arg = args
                        .first()
                        .map(|arg| self.expression(arg))
                        .unwrap_or_default();
                    let call = format!("call void @print(i32 {})", arg);
                    self.w.line(&call);
                    return arg;
                }
                let arg_temps = args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Vec<_>>();
                let temp = self.next_temp();
                let args = arg_temps
                    .iter()
                    .map(|arg| format!("i32 {}", arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                let call = format!("{} = call i32 @{}({})", temp, callee, args);
                self.w.line(&call);
                temp
            }
        }
    }
}
