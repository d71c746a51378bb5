use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Language used when selecting interpretation texts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English, the language every rule must provide
    #[default]
    En,
    /// Russian, served from `interpretation_ru` when present
    Ru,
}

impl Locale {
    /// Text returned when no interpretation rule matches a result
    pub const fn fallback_interpretation(self) -> &'static str {
        match self {
            Locale::En => "Result calculated",
            Locale::Ru => "Результат рассчитан",
        }
    }

    /// Two-letter language code
    pub const fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported locale code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale '{0}' (expected 'en' or 'ru')")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "ru" | "ru-ru" => Ok(Locale::Ru),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!(" ru-RU ".parse::<Locale>().unwrap(), Locale::Ru);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn fallback_text_depends_on_locale() {
        assert_eq!(Locale::En.fallback_interpretation(), "Result calculated");
        assert_eq!(Locale::Ru.fallback_interpretation(), "Результат рассчитан");
    }
}
