use thiserror::Error;

use super::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("'{0}' is a function, not a variable")]
    FunctionAsValue(String),

    #[error("Arithmetic operator requires int, got {0}")]
    ArithmeticOperand(Type),

    #[error("Comparison requires int, got {0}")]
    ComparisonOperand(Type),

    #[error("Equality comparison requires same types, got {0} and {1}")]
    EqualityMismatch(Type, Type),

    #[error("Logical operator requires bool, got {0}")]
    LogicalOperand(Type),

    #[error("Logical NOT requires bool, got {0}")]
    NotOperand(Type),

    #[error("Undefined function '{0}'")]
    UndefinedFunction(String),

    #[error("'{0}' is not a function")]
    NotAFunction(String),

    #[error("Function '{name}' expects {expected} arguments, got {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Function '{name}' parameter {index} expects {expected}, got {found}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: Type,
        found: Type,
    },

    #[error("Variable '{0}' already declared")]
    DuplicateVariable(String),

    #[error("Duplicate function '{0}'")]
    DuplicateFunction(String),

    #[error("Duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("Cannot assign to function '{0}'")]
    AssignToFunction(String),

    #[error("Cannot assign {found} to variable of type {expected}")]
    AssignmentMismatch { expected: Type, found: Type },

    #[error("If condition must be bool, got {0}")]
    IfCondition(Type),

    #[error("While condition must be bool, got {0}")]
    WhileCondition(Type),

    #[error("Return type mismatch: expected {expected}, got {found}")]
    ReturnMismatch { expected: Type, found: Type },

    #[error("Function must return {0}")]
    MissingReturnValue(Type),
}
