//! Core types for the address subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A Mexican postal code: exactly five ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a postal code, rejecting anything that is not `^\d{5}$`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if is_postal_code(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AddressError::InvalidInput(format!(
                "postal code must be exactly 5 digits, got '{}'",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// True when `raw` is exactly five ASCII digits.
pub fn is_postal_code(raw: &str) -> bool {
    raw.len() == 5 && raw.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

/// The provider's simplified record for one postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCodeRecord {
    pub code: PostalCode,
    /// Settlement (colonia) names sharing this code, in provider order.
    pub settlements: Vec<String>,
    pub settlement_type: String,
    pub municipality: String,
    pub state: String,
    pub city: String,
    pub country: String,
}

/// Fields a form pre-fills after a postal code resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autocomplete {
    pub state: String,
    pub municipality: String,
    pub city: String,
    pub neighborhoods: Vec<String>,
}

impl From<PostalCodeRecord> for Autocomplete {
    fn from(record: PostalCodeRecord) -> Self {
        Self {
            state: record.state,
            municipality: record.municipality,
            city: record.city,
            neighborhoods: record.settlements,
        }
    }
}

/// Free-text address held by the publication form while the user types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDraft {
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub neighborhood: String,
    pub municipality: String,
    pub city: String,
    pub state: String,
}

impl AddressDraft {
    pub fn to_check(&self) -> AddressCheck {
        AddressCheck {
            street: self.street.clone(),
            number: self.number.clone(),
            postal_code: self.postal_code.clone(),
            neighborhood: self.neighborhood.clone(),
            municipality: self.municipality.clone(),
            state: self.state.clone(),
        }
    }
}

/// Input to address validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCheck {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    pub postal_code: String,
    pub neighborhood: String,
    pub municipality: String,
    pub state: String,
}

/// Outcome of an explicit validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Canonical record whenever the postal-code lookup succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<PostalCodeRecord>,
}

impl ValidationResult {
    pub(crate) fn rejected(error: &str) -> Self {
        Self {
            valid: false,
            errors: vec![error.to_string()],
            canonical: None,
        }
    }

    pub(crate) fn from_errors(errors: Vec<String>, canonical: PostalCodeRecord) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            canonical: Some(canonical),
        }
    }
}

/// Address resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Malformed postal code or empty lookup key. Never reaches the network.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Transport or provider-reported failure.
    #[error("Lookup failed: {0}")]
    LookupFailed(String),
    /// The provider affirmatively does not know this postal code.
    #[error("Postal code not found: '{0}'")]
    NotFound(String),
    /// A list lookup failed and was degraded to an empty result.
    #[error("{operation} unavailable: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_shape() {
        assert!(PostalCode::parse("97205").is_ok());
        assert!(PostalCode::parse("9720").is_err());
        assert!(PostalCode::parse("972055").is_err());
        assert!(PostalCode::parse("97a05").is_err());
        assert!(PostalCode::parse(" 9720").is_err());
        // Non-ASCII digits are rejected even though they are numeric.
        assert!(PostalCode::parse("٩٧٢٠٥").is_err());
    }

    #[test]
    fn test_postal_code_rejects_bad_json() {
        let ok: PostalCode = serde_json::from_str("\"01000\"").unwrap();
        assert_eq!(ok.as_str(), "01000");
        assert!(serde_json::from_str::<PostalCode>("\"1000\"").is_err());
    }

    #[test]
    fn test_autocomplete_projection() {
        let record = PostalCodeRecord {
            code: PostalCode::parse("97205").unwrap(),
            settlements: vec!["Itzimná".into(), "Centro".into()],
            settlement_type: "Colonia".into(),
            municipality: "Mérida".into(),
            state: "Yucatán".into(),
            city: "Mérida".into(),
            country: "México".into(),
        };
        let auto = Autocomplete::from(record);
        assert_eq!(auto.state, "Yucatán");
        assert_eq!(auto.municipality, "Mérida");
        assert_eq!(auto.neighborhoods, vec!["Itzimná", "Centro"]);
    }

    #[test]
    fn test_validation_result_validity_tracks_errors() {
        let record = PostalCodeRecord {
            code: PostalCode::parse("01000").unwrap(),
            settlements: vec![],
            settlement_type: String::new(),
            municipality: String::new(),
            state: String::new(),
            city: String::new(),
            country: String::new(),
        };
        assert!(ValidationResult::from_errors(vec![], record.clone()).valid);
        let bad = ValidationResult::from_errors(vec!["x".into()], record);
        assert!(!bad.valid);
        assert!(bad.canonical.is_some());
    }
}
