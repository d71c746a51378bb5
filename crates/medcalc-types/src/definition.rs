use crate::Locale;
use serde::{Deserialize, Serialize};

/// Authored description of one scorable formula.
///
/// The definition is plain data. Consistency between `formula_template` placeholders and
/// `input_fields` is checked when the definition is compiled by `medcalc-core`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorDefinition {
    /// Stable identifier used by the catalog and the HTTP API
    pub id: String,
    /// Display name
    pub name: String,
    /// Russian display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_ru: Option<String>,
    /// Short description of what the calculator assesses
    #[serde(default)]
    pub description: String,
    /// Russian description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_ru: Option<String>,
    /// Clinical category, e.g. "Cardiology"
    pub category: String,
    /// Arithmetic template with `{field}` placeholders
    #[serde(alias = "formula")]
    pub formula_template: String,
    /// Input fields, in display order
    #[serde(default)]
    pub input_fields: Vec<InputField>,
    /// Interpretation rules, evaluated top to bottom
    #[serde(default)]
    pub interpretation_rules: Vec<InterpretationRule>,
}

impl CalculatorDefinition {
    /// Create a definition with no fields and no rules
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        formula_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            name_ru: None,
            description: String::new(),
            description_ru: None,
            category: category.into(),
            formula_template: formula_template.into(),
            input_fields: Vec::new(),
            interpretation_rules: Vec::new(),
        }
    }

    /// Append an input field
    pub fn with_field(mut self, field: InputField) -> Self {
        self.input_fields.push(field);
        self
    }

    /// Append an interpretation rule
    pub fn with_rule(mut self, condition: &str, interpretation: &str) -> Self {
        self.interpretation_rules.push(InterpretationRule::new(condition, interpretation));
        self
    }

    /// Append a fully built interpretation rule
    pub fn with_interpretation(mut self, rule: InterpretationRule) -> Self {
        self.interpretation_rules.push(rule);
        self
    }

    /// Look up an input field by name
    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.input_fields.iter().find(|f| f.name == name)
    }

    /// Display name in the requested locale
    pub fn display_name(&self, locale: Locale) -> &str {
        match (locale, &self.name_ru) {
            (Locale::Ru, Some(name)) => name,
            _ => &self.name,
        }
    }
}

/// Kind of value an input field accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free numeric entry, optionally bounded by `min`/`max`
    #[default]
    Number,
    /// One of a fixed list of scored options
    Select,
}

/// Specification of a single calculator input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    /// Placeholder name used in the formula template
    pub name: String,
    /// Human-readable label
    #[serde(default)]
    pub label: String,
    /// Russian label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_ru: Option<String>,
    /// Measurement unit, e.g. "kg"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Value kind
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Whether the caller must supply a value
    #[serde(default = "default_required")]
    pub required: bool,
    /// Inclusive lower bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for select fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

fn default_required() -> bool {
    true
}

impl InputField {
    /// A required numeric field with optional bounds
    pub fn number(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            label_ru: None,
            name,
            unit: None,
            field_type: FieldType::Number,
            required: true,
            min,
            max,
            options: Vec::new(),
        }
    }

    /// A required select field with the given `(value, label)` options
    pub fn select(name: impl Into<String>, options: &[(f64, &str)]) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            label_ru: None,
            name,
            unit: None,
            field_type: FieldType::Select,
            required: true,
            min: None,
            max: None,
            options: options
                .iter()
                .map(|(value, label)| FieldOption {
                    value: *value,
                    label: (*label).to_string(),
                    label_ru: None,
                })
                .collect(),
        }
    }

    /// Mark the field optional
    ///
    /// Input validation then accepts an absent value. Calculator compilation
    /// rejects optional fields, because every declared field appears in the
    /// formula and an absent one could never be evaluated.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Label in the requested locale
    pub fn display_label(&self, locale: Locale) -> &str {
        match (locale, &self.label_ru) {
            (Locale::Ru, Some(label)) => label,
            _ => &self.label,
        }
    }
}

/// One scored choice of a select field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Numeric value substituted into the formula
    pub value: f64,
    /// Label shown to the user
    #[serde(default)]
    pub label: String,
    /// Russian label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_ru: Option<String>,
}

/// A `(condition, interpretation)` pair matched against a computed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretationRule {
    /// Condition expression such as `">= 18.5 and < 25"`; empty means always
    #[serde(default)]
    pub condition: String,
    /// English interpretation text
    pub interpretation: String,
    /// Russian interpretation text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation_ru: Option<String>,
}

impl InterpretationRule {
    /// Rule with English text only
    pub fn new(condition: impl Into<String>, interpretation: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            interpretation: interpretation.into(),
            interpretation_ru: None,
        }
    }

    /// Attach a Russian translation
    pub fn with_russian(mut self, text: impl Into<String>) -> Self {
        self.interpretation_ru = Some(text.into());
        self
    }

    /// Interpretation text for `locale`, falling back to English
    pub fn text(&self, locale: Locale) -> &str {
        match (locale, &self.interpretation_ru) {
            (Locale::Ru, Some(text)) if !text.is_empty() => text,
            _ => &self.interpretation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_seed_style_definition() {
        let json = r#"{
            "id": "bmi",
            "name": "BMI Calculator",
            "category": "General Health",
            "formula": "{weight} / (({height} / 100) ** 2)",
            "input_fields": [
                {"name": "weight", "label": "Weight", "unit": "kg", "type": "number", "min": 20, "max": 300},
                {"name": "height", "label": "Height", "unit": "cm", "type": "number", "required": false}
            ],
            "interpretation_rules": [
                {"condition": "< 18.5", "interpretation": "Underweight", "interpretation_ru": "Недостаточный вес"},
                {"interpretation": "Default"}
            ]
        }"#;

        let definition: CalculatorDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.formula_template, "{weight} / (({height} / 100) ** 2)");
        assert_eq!(definition.input_fields.len(), 2);
        assert!(definition.input_fields[0].required);
        assert!(!definition.input_fields[1].required);
        assert_eq!(definition.input_fields[0].min, Some(20.0));
        assert_eq!(definition.interpretation_rules[1].condition, "");
        assert_eq!(definition.field("height").unwrap().unit.as_deref(), Some("cm"));
    }

    #[test]
    fn select_fields_keep_option_order() {
        let field = InputField::select("ecg", &[(0.0, "Normal"), (2.0, "ST deviation")]);
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(field.options[1].value, 2.0);
        assert_eq!(field.options[1].label, "ST deviation");
    }

    #[test]
    fn rule_text_falls_back_to_english() {
        let rule = InterpretationRule::new("< 1", "Low");
        assert_eq!(rule.text(Locale::Ru), "Low");

        let translated = rule.with_russian("Низкий");
        assert_eq!(translated.text(Locale::Ru), "Низкий");
        assert_eq!(translated.text(Locale::En), "Low");
    }

    #[test]
    fn field_labels_are_localized() {
        let json = r#"{"name": "weight", "label": "Weight (kg)", "label_ru": "Вес (кг)"}"#;
        let field: InputField = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Number);
        assert_eq!(field.display_label(Locale::Ru), "Вес (кг)");
        assert_eq!(field.display_label(Locale::En), "Weight (kg)");
    }

    #[test]
    fn display_name_uses_translation_when_present() {
        let mut definition = CalculatorDefinition::new("gcs", "Glasgow Coma Scale", "Neurology", "{e}");
        assert_eq!(definition.display_name(Locale::Ru), "Glasgow Coma Scale");
        definition.name_ru = Some("Шкала комы Глазго".to_string());
        assert_eq!(definition.display_name(Locale::Ru), "Шкала комы Глазго");
    }
}
