//! First-match interpretation of computed results
//!
//! Rules are tried strictly in authored order and the first one whose condition
//! holds wins. A rule whose condition does not parse is skipped, never an error.

use crate::condition::{Condition, ConditionParseError, parse_condition};
use medcalc_types::{InterpretationRule, Locale};
use serde::Serialize;
use tracing::{debug, warn};

/// Interpretation text of the first matching rule, or the English fallback
pub fn interpret(result: f64, rules: &[InterpretationRule]) -> String {
    interpret_localized(result, rules, Locale::En)
}

/// Interpretation text of the first matching rule in `locale`, or that locale's
/// fallback when no rule matches
pub fn interpret_localized(result: f64, rules: &[InterpretationRule], locale: Locale) -> String {
    for (index, rule) in rules.iter().enumerate() {
        match parse_condition(&rule.condition) {
            Ok(condition) if condition.matches(result) => {
                return rule.text(locale).to_string();
            }
            Ok(_) => {}
            Err(e) => debug!(rule = index, error = %e, "Skipping rule with unrecognized condition"),
        }
    }
    locale.fallback_interpretation().to_string()
}

/// An interpretation rule with its condition parsed ahead of time
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: InterpretationRule,
    condition: Result<Condition, ConditionParseError>,
}

impl CompiledRule {
    pub fn new(rule: InterpretationRule) -> Self {
        let condition = parse_condition(&rule.condition);
        Self { rule, condition }
    }

    pub fn rule(&self) -> &InterpretationRule {
        &self.rule
    }

    /// Parsed condition, or `None` when the rule can never match
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref().ok()
    }

    pub fn matches(&self, result: f64) -> bool {
        self.condition().is_some_and(|c| c.matches(result))
    }
}

/// Authoring problem found while compiling a rule list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDiagnostic {
    /// The condition does not parse, so the rule never matches
    Unparsable { rule: usize, condition: String, message: String },
    /// An earlier unconditional rule always wins, so this rule is unreachable
    Shadowed { rule: usize, by: usize },
}

impl std::fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleDiagnostic::Unparsable { rule, condition, message } => {
                write!(f, "rule {} never matches, condition '{}': {}", rule, condition, message)
            }
            RuleDiagnostic::Shadowed { rule, by } => {
                write!(f, "rule {} is unreachable after unconditional rule {}", rule, by)
            }
        }
    }
}

/// Ordered rules with pre-parsed conditions, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(rules: &[InterpretationRule]) -> Self {
        Self { rules: rules.iter().cloned().map(CompiledRule::new).collect() }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    /// Index and rule of the first match
    pub fn first_match(&self, result: f64) -> Option<(usize, &InterpretationRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, compiled)| compiled.matches(result))
            .map(|(index, compiled)| (index, compiled.rule()))
    }

    pub fn interpret(&self, result: f64, locale: Locale) -> String {
        match self.first_match(result) {
            Some((_, rule)) => rule.text(locale).to_string(),
            None => locale.fallback_interpretation().to_string(),
        }
    }

    /// Rules that can never match
    pub fn diagnostics(&self) -> Vec<RuleDiagnostic> {
        let mut diagnostics = Vec::new();
        let mut unconditional: Option<usize> = None;

        for (index, compiled) in self.rules.iter().enumerate() {
            if let Some(by) = unconditional {
                diagnostics.push(RuleDiagnostic::Shadowed { rule: index, by });
                continue;
            }
            match &compiled.condition {
                Ok(condition) if condition.is_unconditional() => unconditional = Some(index),
                Ok(_) => {}
                Err(e) => diagnostics.push(RuleDiagnostic::Unparsable {
                    rule: index,
                    condition: e.condition.clone(),
                    message: e.message.clone(),
                }),
            }
        }
        diagnostics
    }

    /// Log every diagnostic at `warn` level, tagged with the calculator id
    pub fn warn_diagnostics(&self, calculator: &str) {
        for diagnostic in self.diagnostics() {
            warn!(calculator, %diagnostic, "Interpretation rule will never match");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmi_rules() -> Vec<InterpretationRule> {
        vec![
            InterpretationRule::new("< 18.5", "Underweight").with_russian("Недостаточный вес"),
            InterpretationRule::new(">= 18.5 and < 25", "Normal weight")
                .with_russian("Нормальный вес"),
            InterpretationRule::new(">= 25 and < 30", "Overweight"),
            InterpretationRule::new(">= 30", "Obese"),
        ]
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = bmi_rules();
        assert_eq!(interpret(22.857, &rules), "Normal weight");
        assert_eq!(interpret(18.5, &rules), "Normal weight");
        assert_eq!(interpret(25.0, &rules), "Overweight");
        assert_eq!(interpret(17.0, &rules), "Underweight");
        assert_eq!(interpret(45.0, &rules), "Obese");
    }

    #[test]
    fn unconditional_first_rule_always_wins() {
        let rules = vec![InterpretationRule::new("", "A"), InterpretationRule::new("< 10", "B")];
        for result in [-100.0, 0.0, 5.0, 1e9] {
            assert_eq!(interpret(result, &rules), "A");
        }
    }

    #[test]
    fn malformed_rule_is_skipped() {
        let rules = vec![
            InterpretationRule::new("???", "Broken"),
            InterpretationRule::new(">= 0", "Valid"),
        ];
        assert_eq!(interpret(3.0, &rules), "Valid");
    }

    #[test]
    fn fallback_when_nothing_matches() {
        let rules = vec![InterpretationRule::new("< 0", "Negative")];
        assert_eq!(interpret(1.0, &rules), "Result calculated");
        assert_eq!(interpret_localized(1.0, &rules, Locale::Ru), "Результат рассчитан");
        assert_eq!(interpret(1.0, &[]), "Result calculated");
    }

    #[test]
    fn localized_text_falls_back_to_english() {
        let rules = bmi_rules();
        assert_eq!(interpret_localized(22.0, &rules, Locale::Ru), "Нормальный вес");
        assert_eq!(interpret_localized(27.0, &rules, Locale::Ru), "Overweight");
    }

    #[test]
    fn rule_set_agrees_with_direct_interpretation() {
        let rules = bmi_rules();
        let compiled = RuleSet::compile(&rules);
        for result in [0.0, 18.49, 18.5, 24.999, 25.0, 29.99, 30.0, 100.0] {
            assert_eq!(compiled.interpret(result, Locale::En), interpret(result, &rules));
        }
        assert_eq!(compiled.first_match(26.0).map(|(index, _)| index), Some(2));
    }

    #[test]
    fn diagnostics_report_unreachable_rules() {
        let rules = vec![
            InterpretationRule::new("<> 3", "Typo"),
            InterpretationRule::new("", "Default"),
            InterpretationRule::new("> 10", "Never reached"),
        ];
        let diagnostics = RuleSet::compile(&rules).diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(diagnostics[0], RuleDiagnostic::Unparsable { rule: 0, .. }));
        assert_eq!(diagnostics[1], RuleDiagnostic::Shadowed { rule: 2, by: 1 });
        assert!(RuleSet::compile(&bmi_rules()).diagnostics().is_empty());
    }
}
