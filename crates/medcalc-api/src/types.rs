//! Request and response types of the HTTP API

use medcalc_core::{CompiledCalculator, RuleDiagnostic};
use medcalc_types::{CalculatorDefinition, InterpretationRule, Locale};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub calculators: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCalculatorsQuery {
    pub category: Option<String>,
    pub locale: Option<Locale>,
}

/// Catalog entry without formula details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorSummary {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub input_count: usize,
}

impl CalculatorSummary {
    pub fn from_calculator(calculator: &CompiledCalculator, locale: Locale) -> Self {
        let definition = calculator.definition();
        Self {
            id: definition.id.clone(),
            name: definition.display_name(locale).to_string(),
            category: definition.category.clone(),
            description: match (locale, &definition.description_ru) {
                (Locale::Ru, Some(description)) => description.clone(),
                _ => definition.description.clone(),
            },
            input_count: definition.input_fields.len(),
        }
    }
}

/// Full definition plus authoring diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CalculatorDetail {
    #[serde(flatten)]
    pub definition: CalculatorDefinition,
    pub diagnostics: Vec<RuleDiagnostic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    /// Raw input values, numbers or numeric strings, keyed by field name
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
    pub locale: Option<Locale>,
}

/// Ad hoc formula evaluation, bypassing the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub formula: String,
    #[serde(default)]
    pub inputs: HashMap<String, f64>,
    #[serde(default)]
    pub rules: Vec<InterpretationRule>,
    pub locale: Option<Locale>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub result: f64,
    pub rounded: f64,
    /// Present when rules were supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    pub calculator_id: Option<String>,
    pub limit: Option<usize>,
}
