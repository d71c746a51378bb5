//! Arithmetic evaluation of parsed formulas

use crate::error::EvaluationError;
use crate::expression::ast::{BinaryOperator, Expression, UnaryOperator};

/// Evaluate an AST to a finite `f64`.
///
/// `source` is the substituted expression text the tree was parsed from; it is only
/// used to describe failures.
pub fn evaluate_ast(expr: &Expression, source: &str) -> Result<f64, EvaluationError> {
    match expr {
        Expression::Number(value) => Ok(*value),

        Expression::UnaryOp { operator, operand } => {
            let value = evaluate_ast(operand, source)?;
            Ok(match operator {
                UnaryOperator::Negate => -value,
                UnaryOperator::Plus => value,
            })
        }

        Expression::BinaryOp { .. } => {
            // Flat `+ - * /` chains nest to the left without limit, so walk that spine
            // in a loop and only recurse into right operands
            let mut pending = Vec::new();
            let mut node = expr;
            while let Expression::BinaryOp { left, operator, right } = node {
                pending.push((*operator, right.as_ref()));
                node = left.as_ref();
            }

            let mut value = evaluate_ast(node, source)?;
            for (operator, right) in pending.into_iter().rev() {
                let rhs = evaluate_ast(right, source)?;
                value = apply_binary(operator, value, rhs, source)?;
            }
            Ok(value)
        }
    }
}

fn apply_binary(
    operator: BinaryOperator,
    lhs: f64,
    rhs: f64,
    source: &str,
) -> Result<f64, EvaluationError> {
    let result = match operator {
        BinaryOperator::Add => lhs + rhs,
        BinaryOperator::Subtract => lhs - rhs,
        BinaryOperator::Multiply => lhs * rhs,
        BinaryOperator::Divide => {
            if rhs == 0.0 {
                return Err(EvaluationError::DivisionByZero { expression: source.to_string() });
            }
            lhs / rhs
        }
        BinaryOperator::Power => {
            if lhs == 0.0 && rhs < 0.0 {
                return Err(EvaluationError::DivisionByZero { expression: source.to_string() });
            }
            let value = lhs.powf(rhs);
            if value.is_nan() {
                return Err(EvaluationError::domain(
                    source,
                    format!("{} ** {} is not a real number", lhs, rhs),
                ));
            }
            value
        }
    };

    if result.is_infinite() {
        return Err(EvaluationError::Overflow { expression: source.to_string() });
    }
    Ok(result)
}
