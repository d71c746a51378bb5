//! Registry of compiled calculators
//!
//! The catalog maps calculator ids to [`CompiledCalculator`]s. Definitions are checked
//! and their rules parsed once, at registration; lookups hand out `Arc`s so requests
//! never hold a map guard while evaluating.

use crate::definition::CompiledCalculator;
use crate::error::{CalculatorError, DefinitionError, MedcalcResult};
use crate::expression::Evaluator;
use dashmap::DashMap;
use medcalc_types::CalculatorDefinition;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const BUILTIN_CALCULATORS: &str = include_str!("../data/builtin_calculators.json");

/// Thread-safe, read-mostly map of calculator id to compiled calculator
#[derive(Debug, Default)]
pub struct CalculatorCatalog {
    calculators: DashMap<String, Arc<CompiledCalculator>>,
    evaluator: Evaluator,
}

impl CalculatorCatalog {
    /// Create an empty catalog
    pub fn new(evaluator: Evaluator) -> Self {
        Self { calculators: DashMap::new(), evaluator }
    }

    /// Create a catalog holding the built-in clinical calculators
    pub fn with_builtins(evaluator: Evaluator) -> MedcalcResult<Self> {
        let catalog = Self::new(evaluator);
        let loaded = catalog.load_json_str(BUILTIN_CALCULATORS)?;
        info!(calculators = loaded, "Loaded built-in calculators");
        Ok(catalog)
    }

    pub fn evaluator(&self) -> Evaluator {
        self.evaluator
    }

    /// Compile and register a definition, replacing any calculator with the same id
    pub fn register(
        &self,
        definition: CalculatorDefinition,
    ) -> Result<Arc<CompiledCalculator>, DefinitionError> {
        let compiled = Arc::new(CompiledCalculator::compile(definition, self.evaluator)?);
        if self
            .calculators
            .insert(compiled.id().to_string(), Arc::clone(&compiled))
            .is_some()
        {
            debug!(calculator = %compiled.id(), "Replaced existing calculator");
        }
        Ok(compiled)
    }

    /// Register every definition of a JSON array.
    ///
    /// All definitions are compiled before any is inserted, so a bad document leaves
    /// the catalog untouched. Returns the number of calculators registered.
    #[instrument(skip(self, json))]
    pub fn load_json_str(&self, json: &str) -> MedcalcResult<usize> {
        let definitions: Vec<CalculatorDefinition> = serde_json::from_str(json)?;
        let compiled = definitions
            .into_iter()
            .map(|definition| CompiledCalculator::compile(definition, self.evaluator))
            .collect::<Result<Vec<_>, _>>()?;

        let count = compiled.len();
        for calculator in compiled {
            self.calculators.insert(calculator.id().to_string(), Arc::new(calculator));
        }
        Ok(count)
    }

    /// Register every definition in a JSON file
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn load_file(&self, path: impl AsRef<Path>) -> MedcalcResult<usize> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let count = self.load_json_str(&json)?;
        info!(calculators = count, "Loaded calculator definitions");
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<Arc<CompiledCalculator>> {
        self.calculators.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a calculator, failing with `NotFound`
    pub fn require(&self, id: &str) -> MedcalcResult<Arc<CompiledCalculator>> {
        self.get(id).ok_or_else(|| CalculatorError::NotFound { id: id.to_string() })
    }

    pub fn remove(&self, id: &str) -> Option<Arc<CompiledCalculator>> {
        self.calculators.remove(id).map(|(_, calculator)| calculator)
    }

    /// Calculators sorted by category then name, optionally restricted to one
    /// category (case-insensitive)
    pub fn list(&self, category: Option<&str>) -> Vec<Arc<CompiledCalculator>> {
        let mut calculators: Vec<Arc<CompiledCalculator>> = self
            .calculators
            .iter()
            .filter(|entry| {
                category.is_none_or(|c| entry.value().definition().category.eq_ignore_ascii_case(c))
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        calculators.sort_by(|a, b| {
            let (a, b) = (a.definition(), b.definition());
            a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name))
        });
        calculators
    }

    /// Distinct categories, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .calculators
            .iter()
            .map(|entry| entry.value().definition().category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::EvaluationContext;
    use medcalc_types::{InputField, Locale};

    fn builtins() -> CalculatorCatalog {
        CalculatorCatalog::with_builtins(Evaluator::default()).unwrap()
    }

    #[test]
    fn builtins_compile_without_diagnostics() {
        let catalog = builtins();
        assert!(catalog.len() >= 15);
        for calculator in catalog.list(None) {
            assert!(
                calculator.diagnostics().is_empty(),
                "{} has rule diagnostics: {:?}",
                calculator.id(),
                calculator.diagnostics()
            );
        }
    }

    #[test]
    fn list_filters_by_category_and_sorts() {
        let catalog = builtins();
        let cardiology = catalog.list(Some("cardiology"));
        assert!(!cardiology.is_empty());
        assert!(cardiology.iter().all(|c| c.definition().category == "Cardiology"));

        let names: Vec<&str> = cardiology.iter().map(|c| c.definition().name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(catalog.categories().contains(&"Cardiology".to_string()));
    }

    #[test]
    fn register_replaces_by_id() {
        let catalog = CalculatorCatalog::new(Evaluator::default());
        let first = CalculatorDefinition::new("double", "Double", "Test", "{x} * 2")
            .with_field(InputField::number("x", None, None));
        let second = CalculatorDefinition::new("double", "Triple", "Test", "{x} * 3")
            .with_field(InputField::number("x", None, None));

        catalog.register(first).unwrap();
        catalog.register(second).unwrap();
        assert_eq!(catalog.len(), 1);

        let context: EvaluationContext = [("x", 2.0)].into_iter().collect();
        let calculation = catalog.require("double").unwrap().calculate(&context, Locale::En).unwrap();
        assert_eq!(calculation.result, 6.0);
    }

    #[test]
    fn bad_document_leaves_catalog_untouched() {
        let catalog = CalculatorCatalog::new(Evaluator::default());
        let json = r#"[
            {"id": "ok", "name": "Ok", "category": "Test", "formula": "{a}",
             "input_fields": [{"name": "a"}]},
            {"id": "bad", "name": "Bad", "category": "Test", "formula": "{a} + {b}",
             "input_fields": [{"name": "a"}]}
        ]"#;
        let err = catalog.load_json_str(json).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_INPUT_FIELD");
        assert!(catalog.is_empty());

        assert_eq!(catalog.load_json_str("{not json").unwrap_err().error_code(), "MALFORMED_DEFINITIONS");
    }

    #[test]
    fn missing_calculator_is_not_found() {
        let catalog = CalculatorCatalog::new(Evaluator::default());
        assert_eq!(catalog.require("nope").unwrap_err().error_code(), "NOT_FOUND");
        assert!(catalog.remove("nope").is_none());
    }
}
