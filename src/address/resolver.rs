//! Address resolver: cascading lookups and validation over a postal provider.
//!
//! List lookups degrade to an empty list on failure. Postal-code resolution
//! keeps "unknown code" (`Ok(None)`) distinct from "lookup failed" (`Err`).

use super::provider::{CopomexProvider, PostalProvider, ProviderError};
use super::types::{AddressCheck, AddressError, Autocomplete, PostalCode, PostalCodeRecord, ValidationResult};
use crate::config::Settings;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Fragments shorter than this never reach the provider.
pub const MIN_SEARCH_FRAGMENT: usize = 2;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Single point of contact with the postal-code provider.
#[derive(Clone)]
pub struct AddressResolver {
    provider: Arc<dyn PostalProvider>,
}

impl AddressResolver {
    pub fn new(provider: Arc<dyn PostalProvider>) -> Self {
        Self { provider }
    }

    /// Build a resolver backed by COPOMEX using the configured endpoint and token.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Arc::new(CopomexProvider::new(
            settings.postal_base_url.clone(),
            settings.postal_token.clone(),
            settings.http_timeout,
        )))
    }

    /// All states, in provider order. Empty means "unavailable".
    pub fn list_states(&self) -> Vec<String> {
        degrade("states", self.provider.states())
    }

    pub fn list_municipalities(&self, state: &str) -> Vec<String> {
        let state = state.trim();
        if state.is_empty() {
            return Vec::new();
        }
        degrade("municipalities", self.provider.municipalities(state))
    }

    pub fn list_neighborhoods(&self, municipality: &str) -> Vec<String> {
        let municipality = municipality.trim();
        if municipality.is_empty() {
            return Vec::new();
        }
        degrade("neighborhoods", self.provider.neighborhoods(municipality))
    }

    /// Postal codes matching `fragment`, at most `limit` of them.
    pub fn search_postal_code_candidates(&self, fragment: &str, limit: usize) -> Vec<String> {
        if fragment.chars().count() < MIN_SEARCH_FRAGMENT || limit == 0 {
            return Vec::new();
        }
        let mut codes = degrade("postal code search", self.provider.search_postal_codes(fragment, limit));
        codes.truncate(limit);
        codes
    }

    /// Resolve a 5-digit postal code. `Ok(None)` means the provider does not know it.
    pub fn resolve_postal_code(&self, code: &str) -> Result<Option<PostalCodeRecord>, AddressError> {
        let code = PostalCode::parse(code).map_err(|e| {
            debug!(%e, "rejected postal code before lookup");
            e
        })?;

        self.provider.postal_code_info(&code).map_err(|e| {
            warn!(postal_code = %code, error = %e, "postal code lookup failed");
            lookup_failed(e)
        })
    }

    /// Like [`resolve_postal_code`](Self::resolve_postal_code) but an unknown code is an error.
    pub fn require_postal_code(&self, code: &str) -> Result<PostalCodeRecord, AddressError> {
        self.resolve_postal_code(code)?
            .ok_or_else(|| AddressError::NotFound(code.to_string()))
    }

    pub fn autocomplete_from_postal_code(&self, code: &str) -> Result<Option<Autocomplete>, AddressError> {
        Ok(self.resolve_postal_code(code)?.map(Autocomplete::from))
    }

    /// Check the administrative areas of an address against the provider's record.
    ///
    /// Comparison folds case only; accents must match as the provider spells them.
    /// Street and number are not checked.
    pub fn validate_address(&self, check: &AddressCheck) -> ValidationResult {
        let record = match self.resolve_postal_code(&check.postal_code) {
            Ok(Some(record)) => record,
            Ok(None) | Err(AddressError::InvalidInput(_)) => {
                return ValidationResult::rejected("postal code not found");
            }
            Err(e) => {
                error!(error = %e, "address validation unavailable");
                return ValidationResult::rejected("validation unavailable");
            }
        };

        let mut errors = Vec::new();

        if !same_text(&record.state, &check.state) {
            errors.push(format!("state mismatch; expected {}", record.state));
        }

        if !same_text(&record.municipality, &check.municipality)
            && !same_text(&record.city, &check.municipality)
        {
            errors.push(format!(
                "municipality mismatch; expected {} or {}",
                record.municipality, record.city
            ));
        }

        if !record.settlements.iter().any(|s| same_text(s, &check.neighborhood)) {
            errors.push(format!(
                "neighborhood mismatch; valid options: {}",
                record.settlements.join(", ")
            ));
        }

        ValidationResult::from_errors(errors, record)
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn lookup_failed(e: ProviderError) -> AddressError {
    AddressError::LookupFailed(e.to_string())
}

fn degrade(operation: &'static str, result: Result<Vec<String>, ProviderError>) -> Vec<String> {
    result.unwrap_or_else(|e| {
        let e = AddressError::Unavailable { operation, reason: e.to_string() };
        warn!(error = %e, "degrading to empty list");
        Vec::new()
    })
}
