//! MedCalc Types
//!
//! This crate defines the data model shared by the MedCalc crates: the authored
//! [`CalculatorDefinition`] with its input fields and interpretation rules, and the
//! [`Locale`] used to pick interpretation texts. It carries no evaluation logic so that
//! catalog tooling can depend on it without pulling in the engine.

#![warn(missing_docs)]

mod definition;
mod locale;

pub use definition::{
    CalculatorDefinition, FieldOption, FieldType, InputField, InterpretationRule,
};
pub use locale::{Locale, UnknownLocale};
