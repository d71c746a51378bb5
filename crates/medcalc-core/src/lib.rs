//! MedCalc Core Engine
//!
//! Evaluates medical calculator formulas and matches the results against ordered
//! clinical interpretation rules.
//!
//! The pipeline for one calculation is
//!
//! 1. [`validate_inputs`]: raw request values against the definition's fields
//! 2. [`template::substitute`]: bind values into the `{placeholder}` template
//! 3. [`expression`]: parse and evaluate the arithmetic-only expression
//! 4. [`interpret`]: first matching interpretation rule, or a fallback text
//!
//! Definitions are checked and their rules pre-parsed once by
//! [`CompiledCalculator::compile`], usually through a [`CalculatorCatalog`].
//!
//! ```
//! use medcalc_core::{EvaluationContext, evaluate, interpret};
//! use medcalc_types::InterpretationRule;
//!
//! let inputs: EvaluationContext = [("weight", 70.0), ("height", 175.0)].into_iter().collect();
//! let bmi = evaluate("{weight} / (({height} / 100) ** 2)", &inputs).unwrap();
//!
//! let rules = vec![
//!     InterpretationRule::new("< 18.5", "Underweight"),
//!     InterpretationRule::new(">= 18.5 and < 25", "Normal weight"),
//! ];
//! assert_eq!(interpret(bmi, &rules), "Normal weight");
//! ```

pub mod catalog;
pub mod condition;
pub mod definition;
pub mod error;
pub mod expression;
pub mod interpretation;
pub mod template;
pub mod validation;

pub use catalog::CalculatorCatalog;
pub use condition::{Comparison, Condition, ConditionParseError, EQUALITY_TOLERANCE, parse_condition};
pub use definition::{Calculation, CompiledCalculator, round_for_display};
pub use error::{
    CalculatorError, DefinitionError, EvaluationError, FieldViolation, MedcalcResult,
    ValidationError, ViolationReason,
};
pub use expression::{EvaluationLimits, Evaluator, evaluate, evaluate_expression};
pub use interpretation::{RuleDiagnostic, RuleSet, interpret, interpret_localized};
pub use template::EvaluationContext;
pub use validation::validate_inputs;

pub use medcalc_types::{
    CalculatorDefinition, FieldOption, FieldType, InputField, InterpretationRule, Locale,
};
