use medcalc_core::*;
use std::sync::Arc;
use std::thread;

fn bmi_context(weight: f64) -> EvaluationContext {
    [("weight", weight), ("height", 175.0)].into_iter().collect()
}

#[test]
fn test_shared_calculator_across_threads() {
    let catalog = Arc::new(CalculatorCatalog::with_builtins(Evaluator::default()).unwrap());
    let calculator = catalog.require("bmi").unwrap();

    let expected: Vec<Calculation> = (20..=300)
        .map(|weight| calculator.calculate(&bmi_context(weight as f64), Locale::En).unwrap())
        .collect();
    let expected = Arc::new(expected);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let catalog = Arc::clone(&catalog);
            let expected = Arc::clone(&expected);
            thread::spawn(move || {
                let calculator = catalog.require("bmi").unwrap();
                for round in 0..5 {
                    for (offset, weight) in (20..=300).enumerate() {
                        let locale = if (worker + round) % 2 == 0 { Locale::En } else { Locale::Ru };
                        let calculation =
                            calculator.calculate(&bmi_context(weight as f64), locale).unwrap();
                        assert_eq!(calculation.result, expected[offset].result);
                        assert_eq!(calculation.matched_rule, expected[offset].matched_rule);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_registration_while_reading() {
    let catalog = Arc::new(CalculatorCatalog::with_builtins(Evaluator::default()).unwrap());

    let writer = {
        let catalog = Arc::clone(&catalog);
        thread::spawn(move || {
            for i in 0..200 {
                let definition =
                    CalculatorDefinition::new(format!("scaled_{i}"), "Scaled", "Test", "{x} * 2")
                        .with_field(InputField::number("x", None, None));
                catalog.register(definition).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                for _ in 0..200 {
                    let heart = catalog.require("heart").unwrap();
                    let context: EvaluationContext = [
                        ("history", 0.0),
                        ("ecg", 1.0),
                        ("age", 1.0),
                        ("risk_factors", 0.0),
                        ("troponin", 0.0),
                    ]
                    .into_iter()
                    .collect();
                    let calculation = heart.calculate(&context, Locale::En).unwrap();
                    assert_eq!(calculation.interpretation, "Low risk");
                    let _ = catalog.list(Some("Test"));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(catalog.list(Some("Test")).len(), 200);
}
