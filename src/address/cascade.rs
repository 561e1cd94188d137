//! Cascading state → municipality → neighborhood selection for the publication form.
//!
//! The form never calls the provider itself. Every user action that needs data
//! returns a [`PendingLookup`] stamped with a per-field [`Ticket`]; the caller runs
//! it (on whatever executor it likes) and hands the [`LookupOutcome`] back to
//! [`AddressForm::apply`]. Outcomes whose ticket is no longer the latest for
//! their field are discarded, so a slow response cannot overwrite a newer choice.

use super::resolver::AddressResolver;
use super::types::{is_postal_code, AddressDraft, AddressError, Autocomplete, ValidationResult};
use serde::Serialize;
use tracing::debug;

/// The option list or input a lookup feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    States,
    Municipalities,
    Neighborhoods,
    PostalCode,
}

/// Identifies one issued lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub field: Field,
    pub seq: u64,
}

/// Monotonic sequence for one field. Only the newest ticket is accepted.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    latest: u64,
}

impl SequenceGuard {
    pub fn issue(&mut self, field: Field) -> Ticket {
        self.latest += 1;
        Ticket { field, seq: self.latest }
    }

    /// Make every outstanding ticket stale without issuing a new request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.seq == self.latest
    }
}

#[derive(Debug, Default)]
struct Sequences {
    states: SequenceGuard,
    municipalities: SequenceGuard,
    neighborhoods: SequenceGuard,
    postal_code: SequenceGuard,
}

impl Sequences {
    fn guard(&mut self, field: Field) -> &mut SequenceGuard {
        match field {
            Field::States => &mut self.states,
            Field::Municipalities => &mut self.municipalities,
            Field::Neighborhoods => &mut self.neighborhoods,
            Field::PostalCode => &mut self.postal_code,
        }
    }

    fn issue(&mut self, field: Field) -> Ticket {
        self.guard(field).issue(field)
    }
}

/// Work the caller must perform against the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    States,
    Municipalities { state: String },
    Neighborhoods { municipality: String },
    PostalCode { code: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    pub ticket: Ticket,
    pub lookup: Lookup,
}

impl PendingLookup {
    /// Perform the lookup (blocking) and package the result for [`AddressForm::apply`].
    pub fn run(&self, resolver: &AddressResolver) -> LookupOutcome {
        match &self.lookup {
            Lookup::States => LookupOutcome::Options(resolver.list_states()),
            Lookup::Municipalities { state } => {
                LookupOutcome::Options(resolver.list_municipalities(state))
            }
            Lookup::Neighborhoods { municipality } => {
                LookupOutcome::Options(resolver.list_neighborhoods(municipality))
            }
            Lookup::PostalCode { code } => {
                LookupOutcome::Autocomplete(resolver.autocomplete_from_postal_code(code))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Options(Vec<String>),
    Autocomplete(Result<Option<Autocomplete>, AddressError>),
}

/// What [`AddressForm::apply`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A newer request for the same field was issued; the outcome was dropped.
    Stale,
    Updated,
    /// Applied, and another lookup is needed to finish populating the form.
    FollowUp(PendingLookup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Empty,
    StateChosen,
    MunicipalityChosen,
    PostalCodeResolved,
    NeighborhoodChosen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Success,
    Warning,
    Error,
}

/// Transient message shown after a resolution or validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self { level, text: text.into() }
    }
}

/// Option lists, each scoped to the last resolved parent selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeOptions {
    pub states: Vec<String>,
    pub municipalities: Vec<String>,
    pub neighborhoods: Vec<String>,
}

/// Address portion of the publication form.
#[derive(Debug)]
pub struct AddressForm {
    draft: AddressDraft,
    options: CascadeOptions,
    phase: Phase,
    status: Option<StatusMessage>,
    /// Last 5-digit value sent for resolution.
    requested_code: Option<String>,
    seq: Sequences,
}

impl Default for AddressForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressForm {
    pub fn new() -> Self {
        Self {
            draft: AddressDraft::default(),
            options: CascadeOptions::default(),
            phase: Phase::Empty,
            status: None,
            requested_code: None,
            seq: Sequences::default(),
        }
    }

    pub fn draft(&self) -> &AddressDraft {
        &self.draft
    }

    pub fn options(&self) -> &CascadeOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_street(&mut self, street: &str) {
        self.draft.street = street.to_string();
    }

    pub fn set_number(&mut self, number: &str) {
        self.draft.number = number.to_string();
    }

    /// Load the state list when the form opens.
    pub fn start(&mut self) -> PendingLookup {
        PendingLookup {
            ticket: self.seq.issue(Field::States),
            lookup: Lookup::States,
        }
    }

    /// Choose (or clear, with a blank value) the state.
    pub fn select_state(&mut self, state: &str) -> Option<PendingLookup> {
        self.cancel_postal_lookup();
        self.draft.state = state.to_string();
        self.clear_municipality();

        let state = state.trim();
        if state.is_empty() {
            self.phase = Phase::Empty;
            return None;
        }

        self.phase = Phase::StateChosen;
        Some(PendingLookup {
            ticket: self.seq.issue(Field::Municipalities),
            lookup: Lookup::Municipalities { state: state.to_string() },
        })
    }

    /// Choose (or clear) the municipality.
    pub fn select_municipality(&mut self, municipality: &str) -> Option<PendingLookup> {
        self.cancel_postal_lookup();
        self.draft.municipality = municipality.to_string();
        self.clear_neighborhood();

        let municipality = municipality.trim();
        if municipality.is_empty() {
            self.phase = if self.draft.state.trim().is_empty() {
                Phase::Empty
            } else {
                Phase::StateChosen
            };
            return None;
        }

        self.phase = Phase::MunicipalityChosen;
        Some(PendingLookup {
            ticket: self.seq.issue(Field::Neighborhoods),
            lookup: Lookup::Neighborhoods { municipality: municipality.to_string() },
        })
    }

    pub fn select_neighborhood(&mut self, neighborhood: &str) {
        self.draft.neighborhood = neighborhood.to_string();
        if !neighborhood.trim().is_empty() {
            self.phase = Phase::NeighborhoodChosen;
        } else if self.phase == Phase::NeighborhoodChosen {
            self.phase = if self.draft.municipality.trim().is_empty() {
                Phase::StateChosen
            } else {
                Phase::MunicipalityChosen
            };
        }
    }

    /// Record postal-code input. Returns a lookup only when the value first
    /// becomes a complete 5-digit code.
    pub fn input_postal_code(&mut self, text: &str) -> Option<PendingLookup> {
        self.draft.postal_code = text.to_string();

        if !is_postal_code(text) || self.requested_code.as_deref() == Some(text) {
            return None;
        }

        self.requested_code = Some(text.to_string());
        Some(PendingLookup {
            ticket: self.seq.issue(Field::PostalCode),
            lookup: Lookup::PostalCode { code: text.to_string() },
        })
    }

    /// Apply a completed lookup if it is still the latest for its field.
    pub fn apply(&mut self, pending: &PendingLookup, outcome: LookupOutcome) -> Applied {
        let ticket = pending.ticket;
        if !self.seq.guard(ticket.field).is_current(ticket) {
            debug!(field = ?ticket.field, seq = ticket.seq, "discarding stale lookup");
            return Applied::Stale;
        }

        match (ticket.field, outcome) {
            (Field::States, LookupOutcome::Options(states)) => {
                self.options.states = states;
                Applied::Updated
            }
            (Field::Municipalities, LookupOutcome::Options(list)) => {
                self.options.municipalities = list;
                Applied::Updated
            }
            (Field::Neighborhoods, LookupOutcome::Options(list)) => {
                self.options.neighborhoods = list;
                Applied::Updated
            }
            (Field::PostalCode, LookupOutcome::Autocomplete(result)) => {
                let code = match &pending.lookup {
                    Lookup::PostalCode { code } => code.as_str(),
                    _ => return Applied::Stale,
                };
                if self.draft.postal_code != code {
                    debug!(code, "postal code changed before lookup completed");
                    return Applied::Stale;
                }
                self.apply_autocomplete(result)
            }
            (field, _) => {
                debug!(?field, "lookup outcome does not match its field");
                Applied::Stale
            }
        }
    }

    /// Record an explicit validation. Advisory only: nothing is blocked.
    pub fn record_validation(&mut self, result: &ValidationResult) {
        self.status = Some(if result.valid {
            StatusMessage::new(StatusLevel::Success, "address verified")
        } else {
            StatusMessage::new(StatusLevel::Warning, result.errors.join("; "))
        });
    }

    fn apply_autocomplete(&mut self, result: Result<Option<Autocomplete>, AddressError>) -> Applied {
        match result {
            Ok(Some(auto)) => {
                self.seq.guard(Field::Neighborhoods).invalidate();
                self.draft.state = auto.state.clone();
                self.draft.municipality = auto.municipality;
                self.draft.city = auto.city;
                self.draft.neighborhood.clear();
                self.options.municipalities.clear();
                self.options.neighborhoods = auto.neighborhoods;
                self.phase = Phase::PostalCodeResolved;
                self.status = Some(StatusMessage::new(
                    StatusLevel::Success,
                    "address completed from postal code",
                ));
                Applied::FollowUp(PendingLookup {
                    ticket: self.seq.issue(Field::Municipalities),
                    lookup: Lookup::Municipalities { state: auto.state },
                })
            }
            Ok(None) => {
                // Options from an earlier code no longer apply.
                self.clear_neighborhood();
                self.phase = self.manual_phase();
                self.status = Some(StatusMessage::new(StatusLevel::Warning, "postal code not found"));
                Applied::Updated
            }
            Err(e) => {
                // Allow the same code to be retried.
                self.requested_code = None;
                self.status = Some(StatusMessage::new(StatusLevel::Error, e.to_string()));
                Applied::Updated
            }
        }
    }

    /// A manual selection wins over any postal-code lookup still in flight.
    /// The same code may then be entered again.
    fn cancel_postal_lookup(&mut self) {
        self.seq.guard(Field::PostalCode).invalidate();
        self.requested_code = None;
    }

    fn manual_phase(&self) -> Phase {
        if !self.draft.municipality.trim().is_empty() {
            Phase::MunicipalityChosen
        } else if !self.draft.state.trim().is_empty() {
            Phase::StateChosen
        } else {
            Phase::Empty
        }
    }

    fn clear_municipality(&mut self) {
        self.seq.guard(Field::Municipalities).invalidate();
        self.draft.municipality.clear();
        self.draft.city.clear();
        self.options.municipalities.clear();
        self.clear_neighborhood();
    }

    fn clear_neighborhood(&mut self) {
        self.seq.guard(Field::Neighborhoods).invalidate();
        self.draft.neighborhood.clear();
        self.options.neighborhoods.clear();
    }
}
