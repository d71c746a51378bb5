//! Load-time checking and the compiled form of a calculator definition

use crate::error::{CalculatorError, DefinitionError, EvaluationError, MedcalcResult};
use crate::expression::Evaluator;
use crate::interpretation::{RuleDiagnostic, RuleSet};
use crate::template::{EvaluationContext, is_identifier, placeholders, substitute};
use crate::validation::validate_inputs;
use chrono::{DateTime, Utc};
use medcalc_types::{CalculatorDefinition, FieldType, Locale};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Outcome of one calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    /// Unrounded result, the value matched against the rules
    pub result: f64,
    /// Result rounded to two decimals for display
    pub rounded: f64,
    pub interpretation: String,
    /// Index of the matching rule, `None` when the fallback text was used
    pub matched_rule: Option<usize>,
}

/// Round half away from zero to two decimals
pub fn round_for_display(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() { rounded } else { value }
}

/// A checked calculator definition with pre-parsed interpretation rules.
///
/// Immutable once built; share it behind an `Arc` between concurrent requests.
#[derive(Debug, Clone)]
pub struct CompiledCalculator {
    definition: CalculatorDefinition,
    rules: RuleSet,
    evaluator: Evaluator,
    compiled_at: DateTime<Utc>,
}

impl CompiledCalculator {
    /// Check `definition` and pre-parse its rules.
    ///
    /// Placeholders and input fields must correspond one to one, field constraints must
    /// be coherent and the formula must parse. Rules that can never match are logged
    /// but do not fail compilation.
    #[instrument(skip(definition, evaluator), fields(calculator = %definition.id))]
    pub fn compile(
        definition: CalculatorDefinition,
        evaluator: Evaluator,
    ) -> Result<Self, DefinitionError> {
        check_definition(&definition, &evaluator)?;

        let rules = RuleSet::compile(&definition.interpretation_rules);
        rules.warn_diagnostics(&definition.id);
        debug!(rules = rules.len(), fields = definition.input_fields.len(), "Compiled calculator");

        Ok(Self { definition, rules, evaluator, compiled_at: Utc::now() })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &CalculatorDefinition {
        &self.definition
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Authoring problems in the interpretation rules
    pub fn diagnostics(&self) -> Vec<RuleDiagnostic> {
        self.rules.diagnostics()
    }

    /// Evaluate the formula against an already validated context
    pub fn evaluate(&self, context: &EvaluationContext) -> Result<f64, EvaluationError> {
        self.evaluator.evaluate(&self.definition.formula_template, context)
    }

    /// Evaluate and interpret
    pub fn calculate(
        &self,
        context: &EvaluationContext,
        locale: Locale,
    ) -> Result<Calculation, EvaluationError> {
        let result = self.evaluate(context).inspect_err(|e| {
            debug!(calculator = %self.definition.id, error = %e, "Evaluation failed");
        })?;

        let (interpretation, matched_rule) = match self.rules.first_match(result) {
            Some((index, rule)) => (rule.text(locale).to_string(), Some(index)),
            None => (locale.fallback_interpretation().to_string(), None),
        };

        Ok(Calculation { result, rounded: round_for_display(result), interpretation, matched_rule })
    }

    /// Validate raw request inputs, then evaluate and interpret
    #[instrument(skip(self, raw), fields(calculator = %self.definition.id))]
    pub fn calculate_raw(&self, raw: &Map<String, Value>, locale: Locale) -> MedcalcResult<Calculation> {
        let context = validate_inputs(&self.definition, raw)?;
        self.calculate(&context, locale).map_err(CalculatorError::from)
    }
}

fn check_definition(
    definition: &CalculatorDefinition,
    evaluator: &Evaluator,
) -> Result<(), DefinitionError> {
    let calculator = definition.id.trim();
    if calculator.is_empty() {
        return Err(DefinitionError::EmptyId);
    }

    let mut declared = HashSet::new();
    for field in &definition.input_fields {
        if !is_identifier(&field.name) {
            return Err(DefinitionError::InvalidFieldName {
                calculator: calculator.to_string(),
                field: field.name.clone(),
            });
        }
        if !declared.insert(field.name.as_str()) {
            return Err(DefinitionError::DuplicateInputField {
                calculator: calculator.to_string(),
                field: field.name.clone(),
            });
        }
        if let (Some(min), Some(max)) = (field.min, field.max) {
            if min > max {
                return Err(DefinitionError::InvalidBounds {
                    calculator: calculator.to_string(),
                    field: field.name.clone(),
                    min,
                    max,
                });
            }
        }
        if field.field_type == FieldType::Select && field.options.is_empty() {
            return Err(DefinitionError::EmptySelectOptions {
                calculator: calculator.to_string(),
                field: field.name.clone(),
            });
        }
        // Every field is a formula placeholder, so an absent value could never evaluate
        if !field.required {
            return Err(DefinitionError::OptionalInputField {
                calculator: calculator.to_string(),
                field: field.name.clone(),
            });
        }
    }

    let used = placeholders(&definition.formula_template).map_err(|e| {
        DefinitionError::InvalidPlaceholder {
            calculator: calculator.to_string(),
            position: e.position,
            message: e.message,
        }
    })?;

    if let Some(missing) = used.iter().find(|name| !declared.contains(*name)) {
        return Err(DefinitionError::MissingInputField {
            calculator: calculator.to_string(),
            placeholder: (*missing).to_string(),
        });
    }
    if let Some(unused) = definition.input_fields.iter().find(|f| !used.contains(&f.name.as_str())) {
        return Err(DefinitionError::UnusedInputField {
            calculator: calculator.to_string(),
            field: unused.name.clone(),
        });
    }

    // Structure only: every placeholder bound to 1 so the parser sees real syntax
    let probe: EvaluationContext = used.iter().map(|name| (*name, 1.0)).collect();
    substitute(&definition.formula_template, &probe)
        .and_then(|expression| evaluator.parse(&expression).map(|_| ()))
        .map_err(|source| DefinitionError::InvalidFormula {
            calculator: calculator.to_string(),
            source,
        })
}
