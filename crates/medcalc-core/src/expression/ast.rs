//! Abstract Syntax Tree for arithmetic formulas

use serde::{Deserialize, Serialize};
use std::fmt;

/// AST node of a substituted formula.
///
/// The node set is closed: numbers and arithmetic only. There is no variable,
/// call or string node, so nothing but arithmetic can ever be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Numeric literal
    Number(f64),

    /// Binary operation (a + b, a ** b, ...)
    BinaryOp { left: Box<Expression>, operator: BinaryOperator, right: Box<Expression> },

    /// Unary operation (-a, +a)
    UnaryOp { operator: UnaryOperator, operand: Box<Expression> },
}

/// Binary operators of the formula grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// `**`, right-associative
    Power,
}

/// Unary operators of the formula grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Numeric negation (-x)
    Negate,
    /// Explicit sign (+x), a no-op
    Plus,
}

impl Expression {
    /// Create a numeric literal
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    /// Create a binary operation
    pub fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Self {
        Self::BinaryOp { left: Box::new(left), operator, right: Box::new(right) }
    }

    /// Create a unary operation
    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Self::UnaryOp { operator, operand: Box::new(operand) }
    }

    /// Create a negation
    pub fn negate(operand: Expression) -> Self {
        Self::unary(UnaryOperator::Negate, operand)
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Expression::Number(_) => 1,
            Expression::BinaryOp { left, right, .. } => 1 + left.node_count() + right.node_count(),
            Expression::UnaryOp { operand, .. } => 1 + operand.node_count(),
        }
    }
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "**",
        }
    }
}

impl fmt::Display for Expression {
    /// Fully parenthesised rendering, mostly for diagnostics
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{n}"),
            Expression::BinaryOp { left, operator, right } => {
                write!(f, "({} {} {})", left, operator.symbol(), right)
            }
            Expression::UnaryOp { operator: UnaryOperator::Negate, operand } => {
                write!(f, "(-{operand})")
            }
            Expression::UnaryOp { operator: UnaryOperator::Plus, operand } => {
                write!(f, "(+{operand})")
            }
        }
    }
}
