//! Formula template substitution
//!
//! A template such as `{weight} / (({height} / 100) ** 2)` is turned into a pure
//! arithmetic expression by replacing each `{identifier}` with the decimal text of its
//! bound value. Whitespace just inside the braces is tolerated (`{ weight }`).

use crate::error::EvaluationError;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Per-call mapping from input field name to numeric value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    values: HashMap<String, f64>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &HashMap<String, f64> {
        &self.values
    }
}

impl From<HashMap<String, f64>> for EvaluationContext {
    fn from(values: HashMap<String, f64>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EvaluationContext {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

/// A piece of a scanned template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal formula text copied through unchanged
    Text(&'a str),
    /// Name inside a `{...}` placeholder
    Placeholder(&'a str),
}

/// A `{` that does not open a well-formed placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderError {
    /// Character offset of the opening brace
    pub position: usize,
    pub message: String,
}

/// Split a template into literal text and placeholder names.
///
/// A placeholder is `{`, optional whitespace, an identifier (`[A-Za-z_][A-Za-z0-9_]*`),
/// optional whitespace and `}`. Anything else after a `{` is an error; a stray `}` is
/// left in the text and rejected later by the expression lexer.
pub fn scan(template: &str) -> Result<Vec<Segment<'_>>, PlaceholderError> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        let position = template[..offset + open].chars().count();
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| PlaceholderError {
            position,
            message: "unterminated placeholder".to_string(),
        })?;
        let name = after[..close].trim();
        if !is_identifier(name) {
            return Err(PlaceholderError {
                position,
                message: format!("'{}' is not a valid placeholder name", &after[..close]),
            });
        }
        segments.push(Segment::Placeholder(name));

        let consumed = open + 1 + close + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Distinct placeholder names in order of first appearance
pub fn placeholders(template: &str) -> Result<Vec<&str>, PlaceholderError> {
    let mut names: Vec<&str> = Vec::new();
    for segment in scan(template)? {
        if let Segment::Placeholder(name) = segment {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Whether `name` can be used as a field name / placeholder
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Replace every placeholder in `template` with its value from `context`
pub fn substitute(template: &str, context: &EvaluationContext) -> Result<String, EvaluationError> {
    let segments = scan(template)
        .map_err(|e| EvaluationError::syntax(template, e.position, e.message))?;

    let mut expression = String::with_capacity(template.len() + 16);
    for segment in segments {
        match segment {
            Segment::Text(text) => expression.push_str(text),
            Segment::Placeholder(name) => {
                let value = context
                    .get(name)
                    .ok_or_else(|| EvaluationError::UnknownVariable { name: name.to_string() })?;
                if !value.is_finite() {
                    return Err(EvaluationError::NonFiniteInput { name: name.to_string() });
                }
                write_value(&mut expression, value);
            }
        }
    }
    Ok(expression)
}

/// Shortest round-tripping decimal text; negatives are parenthesised so that
/// `{x} ** 2` with `x = -3` reads `(-3) ** 2`.
fn write_value(out: &mut String, value: f64) {
    // f64's Display never uses exponent notation and never groups digits.
    if value.is_sign_negative() && value != 0.0 {
        let _ = write!(out, "({value})");
    } else {
        let _ = write!(out, "{}", value.abs());
    }
}

/// Canonical decimal text of a single value, as it would be substituted
pub fn format_value(value: f64) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, f64)]) -> EvaluationContext {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let ctx = context(&[("weight", 70.0), ("height", 175.0)]);
        let expr = substitute("{weight} / (({height} / 100) ** 2) + {weight} * 0", &ctx).unwrap();
        assert_eq!(expr, "70 / ((175 / 100) ** 2) + 70 * 0");
    }

    #[test]
    fn tolerates_whitespace_inside_braces() {
        let ctx = context(&[("qt", 400.0)]);
        assert_eq!(substitute("{ qt } / 2", &ctx).unwrap(), "400 / 2");
    }

    #[test]
    fn unknown_placeholder_is_reported_by_name() {
        let ctx = context(&[("a", 1.0)]);
        let err = substitute("{a} + {b}", &ctx).unwrap_err();
        assert_eq!(err, EvaluationError::UnknownVariable { name: "b".to_string() });
    }

    #[test]
    fn negative_values_are_parenthesised() {
        assert_eq!(format_value(-3.0), "(-3)");
        assert_eq!(format_value(-0.0), "0");
        assert_eq!(format_value(0.1), "0.1");
        assert_eq!(format_value(1e21), "1000000000000000000000");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let ctx = context(&[("a", f64::NAN)]);
        assert_eq!(
            substitute("{a}", &ctx).unwrap_err(),
            EvaluationError::NonFiniteInput { name: "a".to_string() }
        );
    }

    #[test]
    fn malformed_placeholders_are_syntax_errors() {
        let ctx = context(&[]);
        let err = substitute("1 + {weight", &ctx).unwrap_err();
        assert!(matches!(err, EvaluationError::Syntax { position: 4, .. }));

        let err = scan("{2x}").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn placeholders_are_deduplicated_in_order() {
        let names = placeholders("{diastolic} + ({systolic} - {diastolic}) / 3").unwrap();
        assert_eq!(names, vec!["diastolic", "systolic"]);
        assert!(placeholders("50 + 2.3").unwrap().is_empty());
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("risk_factors"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
