//! Error handling for the MedCalc engine
//!
//! Errors are split by the phase that produces them: [`DefinitionError`] when a
//! calculator is registered, [`ValidationError`] when raw request inputs are checked,
//! and [`EvaluationError`] when a formula is substituted and evaluated. All of them fold
//! into [`CalculatorError`] for callers that do not care about the phase.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure while substituting or evaluating a formula.
///
/// Every variant is a deterministic function of the formula and its inputs, so none of
/// them is worth retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// A placeholder has no bound value
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// Malformed expression: bad token, unbalanced parentheses, empty input, size limits
    #[error("Syntax error at position {position} in '{expression}': {message}")]
    Syntax { message: String, expression: String, position: usize },

    /// Division (or a negative power) of zero
    #[error("Division by zero in '{expression}'")]
    DivisionByZero { expression: String },

    /// Mathematically undefined operation, e.g. a fractional power of a negative number
    #[error("Domain error in '{expression}': {message}")]
    Domain { message: String, expression: String },

    /// A finite computation produced an infinite value
    #[error("Numeric overflow in '{expression}'")]
    Overflow { expression: String },

    /// A bound input was NaN or infinite
    #[error("Input '{name}' is not a finite number")]
    NonFiniteInput { name: String },
}

impl EvaluationError {
    /// Create a syntax error
    pub fn syntax(expression: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Syntax { message: message.into(), expression: expression.to_string(), position }
    }

    /// Create a domain error
    pub fn domain(expression: &str, message: impl Into<String>) -> Self {
        Self::Domain { message: message.into(), expression: expression.to_string() }
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            EvaluationError::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            EvaluationError::Syntax { .. } => "SYNTAX_ERROR",
            EvaluationError::DivisionByZero { .. } => "DIVISION_BY_ZERO",
            EvaluationError::Domain { .. } => "DOMAIN_ERROR",
            EvaluationError::Overflow { .. } => "NUMERIC_OVERFLOW",
            EvaluationError::NonFiniteInput { .. } => "NON_FINITE_INPUT",
        }
    }

    /// The expression that failed, when the error concerns one
    pub fn expression(&self) -> Option<&str> {
        match self {
            EvaluationError::Syntax { expression, .. }
            | EvaluationError::DivisionByZero { expression }
            | EvaluationError::Domain { expression, .. }
            | EvaluationError::Overflow { expression } => Some(expression),
            EvaluationError::UnknownVariable { .. } | EvaluationError::NonFiniteInput { .. } => {
                None
            }
        }
    }
}

/// Inconsistency in a calculator definition, detected once at registration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Calculator definition has an empty id")]
    EmptyId,

    #[error("Calculator '{calculator}': placeholder '{{{placeholder}}}' has no matching input field")]
    MissingInputField { calculator: String, placeholder: String },

    #[error("Calculator '{calculator}': input field '{field}' is not used by the formula")]
    UnusedInputField { calculator: String, field: String },

    #[error("Calculator '{calculator}': input field '{field}' is declared more than once")]
    DuplicateInputField { calculator: String, field: String },

    #[error("Calculator '{calculator}': '{field}' is not a valid field name")]
    InvalidFieldName { calculator: String, field: String },

    #[error("Calculator '{calculator}': malformed placeholder at position {position}: {message}")]
    InvalidPlaceholder { calculator: String, position: usize, message: String },

    #[error("Calculator '{calculator}': formula does not parse: {source}")]
    InvalidFormula {
        calculator: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Calculator '{calculator}': field '{field}' has min {min} greater than max {max}")]
    InvalidBounds { calculator: String, field: String, min: f64, max: f64 },

    #[error("Calculator '{calculator}': select field '{field}' has no options")]
    EmptySelectOptions { calculator: String, field: String },

    #[error("Calculator '{calculator}': input field '{field}' is used by the formula and cannot be optional")]
    OptionalInputField { calculator: String, field: String },
}

impl DefinitionError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            DefinitionError::EmptyId => "EMPTY_ID",
            DefinitionError::MissingInputField { .. } => "MISSING_INPUT_FIELD",
            DefinitionError::UnusedInputField { .. } => "UNUSED_INPUT_FIELD",
            DefinitionError::DuplicateInputField { .. } => "DUPLICATE_INPUT_FIELD",
            DefinitionError::InvalidFieldName { .. } => "INVALID_FIELD_NAME",
            DefinitionError::InvalidPlaceholder { .. } => "INVALID_PLACEHOLDER",
            DefinitionError::InvalidFormula { .. } => "INVALID_FORMULA",
            DefinitionError::InvalidBounds { .. } => "INVALID_BOUNDS",
            DefinitionError::EmptySelectOptions { .. } => "EMPTY_SELECT_OPTIONS",
            DefinitionError::OptionalInputField { .. } => "OPTIONAL_INPUT_FIELD",
        }
    }
}

/// Why a single raw input was rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationReason {
    /// Required value absent, null or blank
    Missing,
    /// Value is not a finite number
    NotANumber { value: String },
    /// Value below the field's `min`
    BelowMinimum { value: f64, min: f64 },
    /// Value above the field's `max`
    AboveMaximum { value: f64, max: f64 },
    /// Value is not one of the select options
    NotAnOption { value: f64 },
}

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: ViolationReason,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ViolationReason::Missing => write!(f, "'{}' is required", self.field),
            ViolationReason::NotANumber { value } => {
                write!(f, "'{}' must be a number, got {}", self.field, value)
            }
            ViolationReason::BelowMinimum { value, min } => {
                write!(f, "'{}' must be at least {}, got {}", self.field, min, value)
            }
            ViolationReason::AboveMaximum { value, max } => {
                write!(f, "'{}' must not exceed {}, got {}", self.field, max, value)
            }
            ViolationReason::NotAnOption { value } => {
                write!(f, "'{}' does not accept {}", self.field, value)
            }
        }
    }
}

/// Raw inputs failed the definition's field constraints
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid inputs: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Any failure produced by the MedCalc engine
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Calculator '{id}' not found")]
    NotFound { id: String },

    #[error("Failed to read calculator definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed calculator definitions: {0}")]
    Json(#[from] serde_json::Error),
}

impl CalculatorError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            CalculatorError::Definition(e) => e.error_code(),
            CalculatorError::Evaluation(e) => e.error_code(),
            CalculatorError::Validation(_) => "VALIDATION_ERROR",
            CalculatorError::NotFound { .. } => "NOT_FOUND",
            CalculatorError::Io(_) => "IO_ERROR",
            CalculatorError::Json(_) => "MALFORMED_DEFINITIONS",
        }
    }

    /// Whether the caller (rather than the operator) caused the error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CalculatorError::Evaluation(_)
                | CalculatorError::Validation(_)
                | CalculatorError::NotFound { .. }
        )
    }
}

/// Result type alias for engine operations
pub type MedcalcResult<T> = Result<T, CalculatorError>;
