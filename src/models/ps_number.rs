// src/models/ps_number.rs
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

static PS_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PS\d+$").expect("ps number regex is valid"));

/// Identificador de login dos utilizadores: `PS` seguido de dígitos, sempre em maiúsculas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PsNumber(String);

impl PsNumber {
    /// Normaliza (trim + uppercase) e valida contra `^PS\d+$`.
    pub fn parse(raw: &str) -> Result<Self, InvalidPsNumber> {
        let normalized = normalize(raw);
        if PS_NUMBER_REGEX.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(InvalidPsNumber(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Só a normalização, sem validar.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn is_valid(candidate: &str) -> bool {
    PS_NUMBER_REGEX.is_match(candidate)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid PS Number '{0}' (expected PS followed by digits)")]
pub struct InvalidPsNumber(pub String);

impl TryFrom<String> for PsNumber {
    type Error = InvalidPsNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PsNumber::parse(&value)
    }
}

impl From<PsNumber> for String {
    fn from(value: PsNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PsNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PsNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_input_is_normalized_to_uppercase() {
        for raw in ["ps1724", "Ps1", "pS0042", "  ps99  ", "PS123456789"] {
            let ps = PsNumber::parse(raw).unwrap();
            assert!(ps.as_str().starts_with("PS"));
            assert!(is_valid(ps.as_str()), "{} -> {}", raw, ps);
            assert_eq!(ps.as_str()[2..], raw.trim()[2..]);
        }
    }

    #[test]
    fn malformed_values_are_rejected() {
        for raw in ["", "PS", "1724", "PS17a4", "XPS1724", "PS 1724", "PS-1"] {
            assert!(PsNumber::parse(raw).is_err(), "{:?} should be rejected", raw);
        }
    }

    #[test]
    fn deserializing_validates_and_normalizes() {
        let ps: PsNumber = serde_json::from_str("\"ps1724\"").unwrap();
        assert_eq!(ps.as_str(), "PS1724");
        assert!(serde_json::from_str::<PsNumber>("\"abc\"").is_err());
        assert_eq!(serde_json::to_string(&ps).unwrap(), "\"PS1724\"");
    }
}
