//! Two-pass type checker.
//!
//! Pass one registers every function signature into the global scope so
//! call sites can reference functions defined later. Pass two checks
//! each body under a fresh function scope seeded with the parameters.
//! The checker rewrites the `ty` slot of every expression and the
//! declared type of every `var` in place; it stops at the first
//! violation.

use std::collections::HashMap;

use super::errors::SemanticError;
use super::{FunctionSignature, Type};
use crate::syntax::tree::{BinaryOp, Expr, ExprKind, Function, Program, Stmt, UnaryOp};

pub fn check_program(program: &mut Program) -> Result<(), SemanticError> {
    let mut checker = TypeChecker::new();
    checker.register_signatures(program)?;
    for function in &mut program.functions {
        checker.check_function(function)?;
    }
    Ok(())
}

struct TypeChecker {
    functions: HashMap<String, FunctionSignature>,
    /// Innermost scope last. Variables shadow functions and outer
    /// variables of the same name.
    scopes: Vec<HashMap<String, Type>>,
    current_return: Type,
}

impl TypeChecker {
    fn new() -> Self {
        let mut functions = HashMap::new();
        // The built-in print. User code cannot redefine it.
        functions.insert(
            "print".to_string(),
            FunctionSignature {
                params: vec![Type::Int],
                return_type: Type::Void,
            },
        );
        Self {
            functions,
            scopes: Vec::new(),
            current_return: Type::Void,
        }
    }

    fn register_signatures(&mut self, program: &Program) -> Result<(), SemanticError> {
        for function in &program.functions {
            if self.functions.contains_key(&function.name) {
                return Err(SemanticError::DuplicateFunction(function.name.clone()));
            }
            self.functions.insert(
                function.name.clone(),
                FunctionSignature {
                    params: function.params.iter().map(|param| param.ty).collect(),
                    return_type: function.return_type,
                },
            );
        }
        Ok(())
    }

    fn check_function(&mut self, function: &mut Function) -> Result<(), SemanticError> {
        self.scopes.clear();
        self.scopes.push(HashMap::new());
        for param in &function.params {
            let scope = self.current_scope();
            if scope.contains_key(&param.name) {
                return Err(SemanticError::DuplicateParameter(param.name.clone()));
            }
            scope.insert(param.name.clone(), param.ty);
        }
        self.current_return = function.return_type;

        let result = self.check_statement(&mut function.body);
        self.scopes.clear();
        result
    }

    fn current_scope(&mut self) -> &mut HashMap<String, Type> {
        if self.scopes.is_empty() {
            self.scopes.push(HashMap::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn lookup_variable(&self, name: &str) -> Option<Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn check_statement(&mut self, stmt: &mut Stmt) -> Result<(), SemanticError> {
        match stmt {
            Stmt::VarDecl { name, ty, init } => {
                self.check_expression(init)?;
                *ty = init.ty;
                if self.current_scope().contains_key(name.as_str()) {
                    return Err(SemanticError::DuplicateVariable(name.clone()));
                }
                let declared = init.ty;
                self.current_scope().insert(name.clone(), declared);
                Ok(())
            }
            Stmt::Assign { name, value } => {
                let expected = match self.lookup_variable(name) {
                    Some(ty) => ty,
                    None if self.functions.contains_key(name.as_str()) => {
                        return Err(SemanticError::AssignToFunction(name.clone()))
                    }
                    None => return Err(SemanticError::UndefinedVariable(name.clone())),
                };
                self.check_expression(value)?;
                if value.ty != expected {
                    return Err(SemanticError::AssignmentMismatch {
                        expected,
                        found: value.ty,
                    });
                }
                Ok(())
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                self.check_expression(condition)?;
                if condition.ty != Type::Bool {
                    return Err(SemanticError::IfCondition(condition.ty));
                }
                self.check_statement(then_block)?;
                if let Some(else_block) = else_block {
                    self.check_statement(else_block)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.check_expression(condition)?;
                if condition.ty != Type::Bool {
                    return Err(SemanticError::WhileCondition(condition.ty));
                }
                self.check_statement(body)
            }
            Stmt::Return(expr) => {
                match expr {
                    Some(expr) => {
                        self.check_expression(expr)?;
                        if expr.ty != self.current_return {
                            return Err(SemanticError::ReturnMismatch {
                                expected: self.current_return,
                                found: expr.ty,
                            });
                        }
                    }
                    None => {
                        if self.current_return != Type::Void {
                            return Err(SemanticError::MissingReturnValue(self.current_return));
                        }
                    }
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.check_expression(expr),
            Stmt::Block(statements) => {
                self.scopes.push(HashMap::new());
                let mut result = Ok(());
                for statement in statements {
                    result = self.check_statement(statement);
                    if result.is_err() {
                        break;
                    }
                }
                self.scopes.pop();
                result
            }
        }
    }

    fn check_expression(&mut self, expr: &mut Expr) -> Result<(), SemanticError> {
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral(_) => Type::Int,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::Variable(name) => match self.lookup_variable(name) {
                Some(ty) => ty,
                None if self.functions.contains_key(name.as_str()) => {
                    return Err(SemanticError::FunctionAsValue(name.clone()))
                }
                None => return Err(SemanticError::UndefinedVariable(name.clone())),
            },
            ExprKind::Binary { op, left, right } => {
                self.check_expression(left)?;
                self.check_expression(right)?;
                match op {
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Mod => {
                        if left.ty != Type::Int {
                            return Err(SemanticError::ArithmeticOperand(left.ty));
                        }
                        if right.ty != Type::Int {
                            return Err(SemanticError::ArithmeticOperand(right.ty));
                        }
                        Type::Int
                    }
                    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                        if left.ty != Type::Int {
                            return Err(SemanticError::ComparisonOperand(left.ty));
                        }
                        if right.ty != Type::Int {
                            return Err(SemanticError::ComparisonOperand(right.ty));
                        }
                        Type::Bool
                    }
                    BinaryOp::Eq | BinaryOp::Ne => {
                        if left.ty != right.ty {
                            return Err(SemanticError::EqualityMismatch(left.ty, right.ty));
                        }
                        Type::Bool
                    }
                    BinaryOp::And | BinaryOp::Or => {
                        if left.ty != Type::Bool {
                            return Err(SemanticError::LogicalOperand(left.ty));
                        }
                        if right.ty != Type::Bool {
                            return Err(SemanticError::LogicalOperand(right.ty));
                        }
                        Type::Bool
                    }
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                self.check_expression(operand)?;
                if operand.ty != Type::Bool {
                    return Err(SemanticError::NotOperand(operand.ty));
                }
                Type::Bool
            }
            ExprKind::Call { callee, args } => {
                // A local variable shadows a function of the same name.
                if self.lookup_variable(callee).is_some() {
                    return Err(SemanticError::NotAFunction(callee.clone()));
                }
                let signature = match self.functions.get(callee.as_str()) {
                    Some(signature) => signature.clone(),
                    None => return Err(SemanticError::UndefinedFunction(callee.clone())),
                };
                if args.len() != signature.params.len() {
                    return Err(SemanticError::ArgumentCount {
                        name: callee.clone(),
                        expected: signature.params.len(),
                        found: args.len(),
                    });
                }
                for (index, (arg, expected)) in
                    args.iter_mut().zip(&signature.params).enumerate()
                {
                    self.check_expression(arg)?;
                    if arg.ty != *expected {
                        return Err(SemanticError::ArgumentType {
                            name: callee.clone(),
                            index: index + 1,
                            expected: *expected,
                            found: arg.ty,
                        });
                    }
                }
                signature.return_type
            }
        };
        expr.ty = ty;
        Ok(())
    }
}
