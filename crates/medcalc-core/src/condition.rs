//! Interpretation rule conditions
//!
//! A condition is a tiny comparison language matched against a computed result:
//!
//! ```text
//! condition  := ""                       (always matches)
//!             | clause
//!             | clause "and" clause
//! clause     := op number
//! op         := "<" | "<=" | ">" | ">=" | "=" | "=="
//! ```
//!
//! Conditions are parsed into [`Condition`] once, then matched generically.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Absolute tolerance used by `=` and `==`
pub const EQUALITY_TOLERANCE: f64 = 0.01;

/// Comparison operator of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Comparison {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// Equality within [`EQUALITY_TOLERANCE`]
    Equal,
}

impl Comparison {
    /// Whether `result <op> value` holds
    pub fn holds(self, result: f64, value: f64) -> bool {
        match self {
            Comparison::LessThan => result < value,
            Comparison::LessThanOrEqual => result <= value,
            Comparison::GreaterThan => result > value,
            Comparison::GreaterThanOrEqual => result >= value,
            Comparison::Equal => (result - value).abs() <= EQUALITY_TOLERANCE,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
            Comparison::Equal => "==",
        }
    }

    /// Split a leading operator off `clause`, longest symbol first
    fn strip(clause: &str) -> Option<(Comparison, &str)> {
        const OPERATORS: [(&str, Comparison); 6] = [
            (">=", Comparison::GreaterThanOrEqual),
            ("<=", Comparison::LessThanOrEqual),
            ("==", Comparison::Equal),
            (">", Comparison::GreaterThan),
            ("<", Comparison::LessThan),
            ("=", Comparison::Equal),
        ];
        OPERATORS
            .iter()
            .find_map(|(symbol, op)| clause.strip_prefix(symbol).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Structured predicate over a computed result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Condition {
    /// Empty condition, always true
    Unconditional,
    /// `<op> <value>`
    Compare(Comparison, f64),
    /// `<op1> <value1> and <op2> <value2>`, both must hold
    Range(Comparison, f64, Comparison, f64),
}

impl Condition {
    /// Whether `result` satisfies the condition
    pub fn matches(&self, result: f64) -> bool {
        match *self {
            Condition::Unconditional => true,
            Condition::Compare(op, value) => op.holds(result, value),
            Condition::Range(first, first_value, second, second_value) => {
                first.holds(result, first_value) && second.holds(result, second_value)
            }
        }
    }

    pub fn is_unconditional(&self) -> bool {
        matches!(self, Condition::Unconditional)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Unconditional => Ok(()),
            Condition::Compare(op, value) => write!(f, "{} {}", op, value),
            Condition::Range(first, first_value, second, second_value) => {
                write!(f, "{} {} and {} {}", first, first_value, second, second_value)
            }
        }
    }
}

/// A condition string outside the comparison grammar.
///
/// Rules with such a condition never match; the error exists for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognized condition '{condition}': {message}")]
pub struct ConditionParseError {
    pub condition: String,
    pub message: String,
}

impl ConditionParseError {
    fn new(condition: &str, message: impl Into<String>) -> Self {
        Self { condition: condition.to_string(), message: message.into() }
    }
}

/// Parse a rule condition
pub fn parse_condition(input: &str) -> Result<Condition, ConditionParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Condition::Unconditional);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let clauses: Vec<&[&str]> = tokens.split(|token| *token == "and").collect();

    match clauses.as_slice() {
        [single] => {
            let (op, value) = parse_clause(input, single)?;
            Ok(Condition::Compare(op, value))
        }
        [first, second] => {
            let (first_op, first_value) = parse_clause(input, first)?;
            let (second_op, second_value) = parse_clause(input, second)?;
            Ok(Condition::Range(first_op, first_value, second_op, second_value))
        }
        _ => Err(ConditionParseError::new(
            input,
            "at most two comparisons joined by 'and' are supported",
        )),
    }
}

fn parse_clause(input: &str, tokens: &[&str]) -> Result<(Comparison, f64), ConditionParseError> {
    // Either `op number` or a single `opnumber` token; nothing is glued together
    let (op, number) = match tokens {
        [] => return Err(ConditionParseError::new(input, "'and' must join two comparisons")),
        [token] => Comparison::strip(token)
            .ok_or_else(|| ConditionParseError::new(input, "missing comparison operator"))?,
        [operator, number] => match Comparison::strip(operator) {
            Some((op, "")) => (op, *number),
            Some(_) => {
                return Err(ConditionParseError::new(
                    input,
                    format!("unexpected '{}' after comparison", number),
                ));
            }
            None => {
                return Err(ConditionParseError::new(
                    input,
                    format!("'{}' is not a comparison operator", operator),
                ));
            }
        },
        _ => {
            return Err(ConditionParseError::new(
                input,
                "a comparison is an operator followed by one number",
            ));
        }
    };

    if number.is_empty() {
        return Err(ConditionParseError::new(
            input,
            format!("missing number after '{}'", op.symbol()),
        ));
    }

    let value = number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConditionParseError::new(input, format!("'{}' is not a number", number)))?;

    Ok((op, value))
}

impl FromStr for Condition {
    type Err = ConditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_condition(s)
    }
}
