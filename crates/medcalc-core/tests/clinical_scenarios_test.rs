use medcalc_core::*;
use serde_json::{Map, Value, json};

fn catalog() -> CalculatorCatalog {
    CalculatorCatalog::with_builtins(Evaluator::default()).expect("built-in calculators load")
}

fn inputs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("inputs are a JSON object")
}

fn calculate(id: &str, raw: Value, locale: Locale) -> Calculation {
    catalog().require(id).unwrap().calculate_raw(&inputs(raw), locale).unwrap()
}

#[test]
fn test_bmi_normal_weight() {
    let calculation = calculate("bmi", json!({"weight": 70, "height": 175}), Locale::En);

    assert!((calculation.result - 22.857142857142858).abs() < 1e-9);
    assert_eq!(calculation.rounded, 22.86);
    assert_eq!(calculation.interpretation, "Normal weight");
}

#[test]
fn test_bmi_russian_interpretation() {
    let calculation = calculate("bmi", json!({"weight": "95", "height": "175"}), Locale::Ru);
    assert_eq!(calculation.interpretation, "Ожирение");
}

#[test]
fn test_heart_score_high_risk() {
    let calculation = calculate(
        "heart",
        json!({"history": 2, "ecg": 2, "age": 2, "risk_factors": 1, "troponin": 1}),
        Locale::En,
    );
    assert_eq!(calculation.result, 8.0);
    assert_eq!(calculation.interpretation, "High risk");
}

#[test]
fn test_heart_score_rejects_unknown_option() {
    let err = catalog()
        .require("heart")
        .unwrap()
        .calculate_raw(
            &inputs(json!({"history": 2, "ecg": 2, "age": 2, "risk_factors": 1, "troponin": 3})),
            Locale::En,
        )
        .unwrap_err();

    match err {
        CalculatorError::Validation(validation) => {
            assert_eq!(validation.violations.len(), 1);
            assert_eq!(validation.violations[0].field, "troponin");
            assert_eq!(validation.violations[0].reason, ViolationReason::NotAnOption { value: 3.0 });
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[test]
fn test_body_surface_area_uses_square_root() {
    let calculation = calculate("bsa", json!({"height": 180, "weight": 80}), Locale::En);
    assert!((calculation.result - 2.0).abs() < 1e-12);
    assert_eq!(calculation.interpretation, "Body surface area in m²");
}

#[test]
fn test_qtc_bazett_prolonged() {
    let calculation =
        calculate("qtc_bazett", json!({"qt_interval": 400, "rr_interval": 0.64}), Locale::En);
    assert!((calculation.result - 500.0).abs() < 1e-9);
    assert_eq!(calculation.interpretation, "Prolonged QTc - risk of arrhythmia");
}

#[test]
fn test_glasgow_coma_scale_extremes() {
    let mild = calculate(
        "gcs",
        json!({"eye_opening": 4, "verbal_response": 5, "motor_response": 6}),
        Locale::En,
    );
    assert_eq!(mild.result, 15.0);
    assert_eq!(mild.interpretation, "Mild");

    let coma = calculate(
        "gcs",
        json!({"eye_opening": 1, "verbal_response": 1, "motor_response": 1}),
        Locale::Ru,
    );
    assert_eq!(coma.result, 3.0);
    assert_eq!(coma.interpretation, "Тяжелое (Кома)");
}

#[test]
fn test_cockcroft_gault_mild_kidney_disease() {
    let calculation = calculate(
        "cockcroft_gault",
        json!({"age": 60, "weight": 72, "creatinine": 1}),
        Locale::En,
    );
    assert!((calculation.result - 80.0).abs() < 1e-9);
    assert_eq!(calculation.interpretation, "Mild kidney disease");
}

#[test]
fn test_egfr_negative_fractional_exponents() {
    let calculation = calculate("egfr_mdrd", json!({"creatinine": 1, "age": 50}), Locale::En);
    let expected = 175.0 * 50f64.powf(-0.203);
    assert!((calculation.result - expected).abs() < 1e-9);
    assert!(calculation.interpretation.starts_with("Stage 2"));
}

#[test]
fn test_cha2ds2_vasc_equality_rule() {
    let calculation = calculate(
        "cha2ds2_vasc",
        json!({
            "chf": 0, "hypertension": 0, "age": 0, "diabetes": 0,
            "stroke": 0, "vascular": 0, "sex": 1
        }),
        Locale::En,
    );
    assert_eq!(calculation.result, 1.0);
    assert!(calculation.interpretation.starts_with("Low risk"));
    assert_eq!(calculation.matched_rule, Some(1));
}

#[test]
fn test_temperature_conversion() {
    let calculation = calculate("celsius_to_fahrenheit", json!({"celsius": 40}), Locale::En);
    assert_eq!(calculation.result, 104.0);
    assert!(calculation.interpretation.starts_with("High fever"));
}

#[test]
fn test_malformed_rule_does_not_break_interpretation() {
    let catalog = CalculatorCatalog::new(Evaluator::default());
    let definition = CalculatorDefinition::new("score", "Score", "Test", "{a} + {b}")
        .with_field(InputField::number("a", None, None))
        .with_field(InputField::number("b", None, None))
        .with_rule("???", "Broken rule")
        .with_rule(">= 0", "Valid rule");
    let calculator = catalog.register(definition).unwrap();

    let context: EvaluationContext = [("a", 1.0), ("b", 2.0)].into_iter().collect();
    let calculation = calculator.calculate(&context, Locale::En).unwrap();
    assert_eq!(calculation.interpretation, "Valid rule");
    assert_eq!(calculation.matched_rule, Some(1));
}

#[test]
fn test_division_by_zero_is_surfaced() {
    let context: EvaluationContext = [("a", 4.0), ("b", 0.0)].into_iter().collect();
    let err = evaluate("{a} / {b}", &context).unwrap_err();
    assert_eq!(err, EvaluationError::DivisionByZero { expression: "4 / 0".to_string() });
}

#[test]
fn test_first_match_is_order_sensitive() {
    let rules = vec![InterpretationRule::new("", "A"), InterpretationRule::new("< 10", "B")];
    assert_eq!(interpret(5.0, &rules), "A");

    let reversed: Vec<InterpretationRule> = rules.into_iter().rev().collect();
    assert_eq!(interpret(5.0, &reversed), "B");
    assert_eq!(interpret(50.0, &reversed), "A");
}
