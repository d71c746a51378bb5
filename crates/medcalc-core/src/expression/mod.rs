//! Safe arithmetic formula engine
//!
//! Formulas are evaluated in three steps: placeholder substitution, parsing into a
//! closed arithmetic AST, then evaluation of that AST. No step can reach anything but
//! numbers and the operators `+ - * / **`.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use evaluator::evaluate_ast;
pub use parser::parse_expression;

use crate::error::EvaluationError;
use crate::template::{EvaluationContext, substitute};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default maximum length of a substituted expression, in characters
pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 10_000;

/// Default maximum nesting depth of an expression
pub const DEFAULT_MAX_EXPRESSION_DEPTH: usize = 50;

/// Resource limits applied to every parsed expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationLimits {
    /// Maximum characters of substituted expression text
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,
    /// Maximum nesting of parentheses, unary operators and `**` chains
    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,
}

fn default_max_expression_length() -> usize {
    DEFAULT_MAX_EXPRESSION_LENGTH
}

fn default_max_expression_depth() -> usize {
    DEFAULT_MAX_EXPRESSION_DEPTH
}

impl Default for EvaluationLimits {
    fn default() -> Self {
        Self {
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            max_expression_depth: DEFAULT_MAX_EXPRESSION_DEPTH,
        }
    }
}

/// Stateless formula evaluator carrying its resource limits.
///
/// `Evaluator` is `Copy` and holds no mutable state, so one value can be shared freely
/// across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    limits: EvaluationLimits,
}

impl Evaluator {
    pub fn new(limits: EvaluationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> EvaluationLimits {
        self.limits
    }

    /// Parse a fully substituted expression
    pub fn parse(&self, expression: &str) -> Result<Expression, EvaluationError> {
        parse_expression(expression, self.limits)
    }

    /// Parse and evaluate a fully substituted expression
    pub fn evaluate_expression(&self, expression: &str) -> Result<f64, EvaluationError> {
        let ast = self.parse(expression)?;
        evaluate_ast(&ast, expression)
    }

    /// Substitute `context` into `template` and evaluate the result
    pub fn evaluate(
        &self,
        template: &str,
        context: &EvaluationContext,
    ) -> Result<f64, EvaluationError> {
        let expression = substitute(template, context)?;
        trace!(template, expression = %expression, "Evaluating substituted formula");
        self.evaluate_expression(&expression)
    }
}

/// Evaluate `template` against `context` with default limits
pub fn evaluate(template: &str, context: &EvaluationContext) -> Result<f64, EvaluationError> {
    Evaluator::default().evaluate(template, context)
}

/// Evaluate a placeholder-free expression with default limits
pub fn evaluate_expression(expression: &str) -> Result<f64, EvaluationError> {
    Evaluator::default().evaluate_expression(expression)
}
