//! The abstract syntax tree. Parents own their children outright, so
//! dropping a [`Program`] releases the whole tree.

use crate::sem::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

/// An expression together with its type. The parser leaves `ty` at a
/// provisional default; the type checker rewrites every slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            ty: Type::Int,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(i32),
    BoolLiteral(bool),
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name = init;` with `ty` inferred from the initializer.
    VarDecl {
        name: String,
        ty: Type,
        init: Expr,
    },
    Assign {
        name: String,
        value: Expr,
    },
    If {
        condition: Expr,
        then_block: Box<Stmt>,
        else_block: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    /// Always a `Stmt::Block`.
    pub body: Stmt,
}

/// A non-empty ordered sequence of functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    /// Total node count, used for statistics and memory accounting.
    pub fn node_count(&self) -> usize {
        self.functions.iter().map(Function::node_count).sum()
    }
}

impl Function {
    pub fn node_count(&self) -> usize {
        1 + self.params.len() + self.body.node_count()
    }
}

impl Stmt {
    pub fn node_count(&self) -> usize {
        match self {
            Stmt::VarDecl { init, .. } => 1 + init.node_count(),
            Stmt::Assign { value, .. } => 1 + value.node_count(),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                1 + condition.node_count()
                    + then_block.node_count()
                    + else_block.as_ref().map_or(0, |block| block.node_count())
            }
            Stmt::While { condition, body } => 1 + condition.node_count() + body.node_count(),
            Stmt::Return(expr) => 1 + expr.as_ref().map_or(0, Expr::node_count),
            Stmt::Expr(expr) => 1 + expr.node_count(),
            Stmt::Block(statements) => 1 + statements.iter().map(Stmt::node_count).sum::<usize>(),
        }
    }
}

impl Expr {
    pub fn node_count(&self) -> usize {
        match &self.kind {
            ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::Variable(_) => 1,
            ExprKind::Binary { left, right, .. } => 1 + left.node_count() + right.node_count(),
            ExprKind::Unary { operand, .. } => 1 + operand.node_count(),
            ExprKind::Call { args, .. } => {
                1 + args.iter().map(Expr::node_count).sum::<usize>()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_count_walks_the_whole_tree() {
        let body = Stmt::Block(vec![Stmt::Return(Some(Expr::new(ExprKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::new(ExprKind::Variable("n".to_string()))),
            right: Box::new(Expr::new(ExprKind::IntLiteral(1))),
        })))]);
        let program = Program {
            functions: vec![Function {
                name: "inc".to_string(),
                params: vec![Param {
                    name: "n".to_string(),
                    ty: Type::Int,
                }],
                return_type: Type::Int,
                body,
            }],
        };

        // function + param + block + return + binary + two leaves
        assert_eq!(program.node_count(), 7);
    }
}
