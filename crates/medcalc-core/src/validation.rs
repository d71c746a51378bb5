//! Raw input validation against a definition's field constraints

use crate::error::{FieldViolation, ValidationError, ViolationReason};
use crate::template::EvaluationContext;
use medcalc_types::{CalculatorDefinition, FieldType, InputField};
use serde_json::{Map, Value};

/// Tolerance when comparing a submitted value with select option values
const OPTION_TOLERANCE: f64 = 1e-9;

enum RawValue {
    Absent,
    Number(f64),
    Invalid(String),
}

fn read_value(value: Option<&Value>) -> RawValue {
    match value {
        None | Some(Value::Null) => RawValue::Absent,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => RawValue::Number(v),
            _ => RawValue::Invalid(n.to_string()),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return RawValue::Absent;
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => RawValue::Number(v),
                _ => RawValue::Invalid(format!("'{}'", s)),
            }
        }
        Some(other) => RawValue::Invalid(other.to_string()),
    }
}

fn check_field(field: &InputField, value: f64) -> Result<(), ViolationReason> {
    match field.field_type {
        FieldType::Select => {
            if field.options.iter().any(|o| (o.value - value).abs() < OPTION_TOLERANCE) {
                Ok(())
            } else {
                Err(ViolationReason::NotAnOption { value })
            }
        }
        FieldType::Number => {
            if let Some(min) = field.min.filter(|min| value < *min) {
                return Err(ViolationReason::BelowMinimum { value, min });
            }
            if let Some(max) = field.max.filter(|max| value > *max) {
                return Err(ViolationReason::AboveMaximum { value, max });
            }
            Ok(())
        }
    }
}

/// Check raw request inputs and build the evaluation context.
///
/// Values may be JSON numbers or numeric strings; `null` and blank strings count as
/// absent. Every violation is reported, not only the first. Keys that do not name an
/// input field are ignored.
pub fn validate_inputs(
    definition: &CalculatorDefinition,
    raw: &Map<String, Value>,
) -> Result<EvaluationContext, ValidationError> {
    let mut context = EvaluationContext::new();
    let mut violations = Vec::new();

    for field in &definition.input_fields {
        let reason = match read_value(raw.get(&field.name)) {
            RawValue::Absent if field.required => ViolationReason::Missing,
            RawValue::Absent => continue,
            RawValue::Invalid(value) => ViolationReason::NotANumber { value },
            RawValue::Number(value) => match check_field(field, value) {
                Ok(()) => {
                    context.insert(field.name.clone(), value);
                    continue;
                }
                Err(reason) => reason,
            },
        };
        violations.push(FieldViolation { field: field.name.clone(), reason });
    }

    if violations.is_empty() { Ok(context) } else { Err(ValidationError { violations }) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn heart() -> CalculatorDefinition {
        let points = [(0.0, "0"), (1.0, "1"), (2.0, "2")];
        CalculatorDefinition::new(
            "heart",
            "HEART Score",
            "Cardiology",
            "{history} + {ecg} + {age} + {risk} + {troponin}",
        )
        .with_field(InputField::select("history", &points))
        .with_field(InputField::select("ecg", &points))
        .with_field(InputField::number("age", Some(0.0), Some(2.0)))
        .with_field(InputField::select("risk", &points))
        .with_field(InputField::select("troponin", &points).optional())
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let context = validate_inputs(
            &heart(),
            &raw(json!({"history": 2, "ecg": "1", "age": " 2 ", "risk": 1.0, "troponin": 2, "extra": "x"})),
        )
        .unwrap();
        assert_eq!(context.len(), 5);
        assert_eq!(context.get("ecg"), Some(1.0));
        assert_eq!(context.get("age"), Some(2.0));
        assert_eq!(context.get("extra"), None);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let context = validate_inputs(
            &heart(),
            &raw(json!({"history": 0, "ecg": 0, "age": 0, "risk": 0, "troponin": null})),
        )
        .unwrap();
        assert_eq!(context.get("troponin"), None);
    }

    #[test]
    fn reports_every_violation() {
        let err = validate_inputs(
            &heart(),
            &raw(json!({"history": 3, "ecg": "abc", "age": 5, "risk": ""})),
        )
        .unwrap_err();

        let reasons: Vec<(&str, &ViolationReason)> =
            err.violations.iter().map(|v| (v.field.as_str(), &v.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                ("history", &ViolationReason::NotAnOption { value: 3.0 }),
                ("ecg", &ViolationReason::NotANumber { value: "'abc'".to_string() }),
                ("age", &ViolationReason::AboveMaximum { value: 5.0, max: 2.0 }),
                ("risk", &ViolationReason::Missing),
            ]
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let definition = CalculatorDefinition::new("t", "T", "Test", "{x}")
            .with_field(InputField::number("x", Some(1.0), Some(10.0)));
        assert!(validate_inputs(&definition, &raw(json!({"x": 1}))).is_ok());
        assert!(validate_inputs(&definition, &raw(json!({"x": 10}))).is_ok());

        let err = validate_inputs(&definition, &raw(json!({"x": 0.5}))).unwrap_err();
        assert_eq!(err.violations[0].reason, ViolationReason::BelowMinimum { value: 0.5, min: 1.0 });
    }

    #[test]
    fn rejects_non_numeric_json_values() {
        let definition = CalculatorDefinition::new("t", "T", "Test", "{x}")
            .with_field(InputField::number("x", None, None));
        for value in [json!(true), json!([1]), json!({"v": 1}), json!("NaN"), json!("inf")] {
            let err = validate_inputs(&definition, &raw(json!({"x": value}))).unwrap_err();
            assert!(matches!(err.violations[0].reason, ViolationReason::NotANumber { .. }));
        }
    }
}
