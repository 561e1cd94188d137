//! Address subsystem for the listing-publication form.
//!
//! Resolves Mexican postal codes through the COPOMEX provider, enumerates
//! states, municipalities and neighborhoods for cascading selection, and
//! checks a typed address against the provider's canonical record.

pub mod cascade;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cascade::{AddressForm, Applied, LookupOutcome, PendingLookup, Phase, StatusLevel, StatusMessage};
pub use provider::{CopomexProvider, PostalProvider, ProviderError};
pub use resolver::{AddressResolver, DEFAULT_SEARCH_LIMIT};
pub use types::{AddressCheck, AddressDraft, AddressError, Autocomplete, PostalCode, PostalCodeRecord, ValidationResult};
