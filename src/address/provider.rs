//! Postal-code data provider: the COPOMEX HTTP API and its response envelope.

use super::types::{PostalCode, PostalCodeRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// `code_error` values the provider uses for an unknown postal code.
const NOT_FOUND_CODES: &[i64] = &[105];

/// Transport-level failures talking to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("provider error {code}: {message}")]
    Provider { code: i64, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// The operations the resolver needs from a postal-code data source.
pub trait PostalProvider: Send + Sync {
    fn states(&self) -> Result<Vec<String>, ProviderError>;

    fn municipalities(&self, state: &str) -> Result<Vec<String>, ProviderError>;

    fn neighborhoods(&self, municipality: &str) -> Result<Vec<String>, ProviderError>;

    /// `Ok(None)` when the provider reports the code as unknown.
    fn postal_code_info(&self, code: &PostalCode) -> Result<Option<PostalCodeRecord>, ProviderError>;

    fn search_postal_codes(&self, fragment: &str, limit: usize) -> Result<Vec<String>, ProviderError>;
}

// ─── Wire format ────────────────────────────────────────────────

/// Every provider response is wrapped in this envelope.
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code_error: i64,
    #[serde(default)]
    error_message: Option<String>,
    response: Option<T>,
}

#[derive(Deserialize)]
struct StatesPayload {
    #[serde(default)]
    estado: Vec<String>,
}

#[derive(Deserialize)]
struct MunicipalitiesPayload {
    #[serde(default)]
    municipios: Vec<String>,
}

#[derive(Deserialize)]
struct ColoniesPayload {
    #[serde(default)]
    colonia: Vec<String>,
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    cp: Vec<String>,
}

#[derive(Deserialize)]
struct CpInfo {
    cp: String,
    #[serde(default)]
    asentamiento: Vec<String>,
    #[serde(default)]
    tipo_asentamiento: Option<String>,
    municipio: String,
    estado: String,
    #[serde(default)]
    ciudad: Option<String>,
    #[serde(default)]
    pais: Option<String>,
}

impl TryFrom<CpInfo> for PostalCodeRecord {
    type Error = ProviderError;

    fn try_from(info: CpInfo) -> Result<Self, Self::Error> {
        let code = PostalCode::parse(&info.cp)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(PostalCodeRecord {
            code,
            settlements: info.asentamiento,
            settlement_type: info.tipo_asentamiento.unwrap_or_default(),
            municipality: info.municipio,
            state: info.estado,
            city: info.ciudad.unwrap_or_default(),
            country: info.pais.unwrap_or_default(),
        })
    }
}

/// Unwrap the envelope, turning `error: true` into a provider error.
fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<Option<T>, ProviderError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    if envelope.error {
        let code = envelope.code_error;
        return Err(ProviderError::Provider {
            code,
            message: envelope
                .error_message
                .unwrap_or_else(|| format!("Error {}", code)),
        });
    }

    Ok(envelope.response)
}

fn decode_list<P, F>(body: &str, pick: F) -> Result<Vec<String>, ProviderError>
where
    P: DeserializeOwned,
    F: FnOnce(P) -> Vec<String>,
{
    Ok(parse_envelope::<P>(body)?.map(pick).unwrap_or_default())
}

fn decode_postal_code_info(body: &str) -> Result<Option<PostalCodeRecord>, ProviderError> {
    match parse_envelope::<CpInfo>(body) {
        Ok(Some(info)) => Ok(Some(info.try_into()?)),
        Ok(None) => Ok(None),
        Err(ProviderError::Provider { code, .. }) if NOT_FOUND_CODES.contains(&code) => Ok(None),
        Err(e) => Err(e),
    }
}

// ─── COPOMEX provider ───────────────────────────────────────────

/// Blocking HTTP client for the COPOMEX postal-code API.
pub struct CopomexProvider {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl CopomexProvider {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("roomhub/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, endpoint: &str, query: &str) -> String {
        let sep = if query.is_empty() { "" } else { "&" };
        format!(
            "{}/{}?{}{}token={}",
            self.base_url,
            endpoint,
            query,
            sep,
            encode_component(&self.token)
        )
    }

    fn fetch(&self, endpoint: &str, query: &str) -> Result<String, ProviderError> {
        debug!(endpoint, query, "postal provider request");

        let response = self
            .agent
            .get(&self.url(endpoint, query))
            .set("Content-Type", "application/json")
            .call();

        match response {
            Ok(r) => r
                .into_string()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string())),
            Err(ureq::Error::Status(code, _)) => Err(ProviderError::Status(code)),
            // Transport errors render the URL, which carries the token.
            Err(ureq::Error::Transport(t)) => Err(ProviderError::Network(format!(
                "{}: {}",
                t.kind(),
                t.message().unwrap_or("request failed")
            ))),
        }
    }
}

impl PostalProvider for CopomexProvider {
    fn states(&self) -> Result<Vec<String>, ProviderError> {
        let body = self.fetch("get_estados", "")?;
        decode_list(&body, |p: StatesPayload| p.estado)
    }

    fn municipalities(&self, state: &str) -> Result<Vec<String>, ProviderError> {
        let endpoint = format!("get_municipio_por_estado/{}", encode_component(state));
        let body = self.fetch(&endpoint, "")?;
        decode_list(&body, |p: MunicipalitiesPayload| p.municipios)
    }

    fn neighborhoods(&self, municipality: &str) -> Result<Vec<String>, ProviderError> {
        let endpoint = format!("get_colonia_por_municipio/{}", encode_component(municipality));
        let body = self.fetch(&endpoint, "")?;
        decode_list(&body, |p: ColoniesPayload| p.colonia)
    }

    fn postal_code_info(&self, code: &PostalCode) -> Result<Option<PostalCodeRecord>, ProviderError> {
        let endpoint = format!("info_cp/{}", code);
        let body = match self.fetch(&endpoint, "type=simplified") {
            Err(ProviderError::Status(404)) => return Ok(None),
            other => other?,
        };
        decode_postal_code_info(&body)
    }

    fn search_postal_codes(&self, fragment: &str, limit: usize) -> Result<Vec<String>, ProviderError> {
        let endpoint = format!("search_cp/{}", encode_component(fragment));
        let body = self.fetch(&endpoint, &format!("limit={}", limit))?;
        decode_list(&body, |p: SearchPayload| p.cp)
    }
}

// ─── URL encoding ───────────────────────────────────────────────

/// Percent-encode a path segment or query value as UTF-8.
pub(crate) fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

// ─── Test double ────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory provider that counts every call it receives.
    #[derive(Default)]
    pub struct StubProvider {
        pub states: Vec<String>,
        pub municipalities: HashMap<String, Vec<String>>,
        pub neighborhoods: HashMap<String, Vec<String>>,
        pub records: HashMap<String, PostalCodeRecord>,
        pub codes: Vec<String>,
        pub failing: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        /// Provider seeded with the Mérida scenario and a few neighbours.
        pub fn merida() -> Self {
            let mut stub = Self {
                states: vec!["Jalisco".into(), "Yucatán".into()],
                codes: vec!["97000".into(), "97203".into(), "97205".into(), "97206".into(), "97208".into(), "97210".into(), "97219".into()],
                ..Self::default()
            };
            stub.municipalities.insert("Yucatán".into(), vec!["Mérida".into(), "Progreso".into()]);
            stub.neighborhoods.insert("Mérida".into(), vec!["Centro".into(), "Itzimná".into(), "García Ginerés".into()]);
            stub.records.insert("97205".into(), merida_record());
            stub
        }

        pub fn failing() -> Self {
            Self { failing: true, ..Self::merida() }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                Err(ProviderError::Network("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    pub fn merida_record() -> PostalCodeRecord {
        PostalCodeRecord {
            code: PostalCode::parse("97205").unwrap(),
            settlements: vec!["Itzimná".into(), "Centro".into()],
            settlement_type: "Colonia".into(),
            municipality: "Mérida".into(),
            state: "Yucatán".into(),
            city: "Mérida".into(),
            country: "México".into(),
        }
    }

    impl PostalProvider for StubProvider {
        fn states(&self) -> Result<Vec<String>, ProviderError> {
            self.hit()?;
            Ok(self.states.clone())
        }

        fn municipalities(&self, state: &str) -> Result<Vec<String>, ProviderError> {
            self.hit()?;
            Ok(self.municipalities.get(state).cloned().unwrap_or_default())
        }

        fn neighborhoods(&self, municipality: &str) -> Result<Vec<String>, ProviderError> {
            self.hit()?;
            Ok(self.neighborhoods.get(municipality).cloned().unwrap_or_default())
        }

        fn postal_code_info(&self, code: &PostalCode) -> Result<Option<PostalCodeRecord>, ProviderError> {
            self.hit()?;
            Ok(self.records.get(code.as_str()).cloned())
        }

        fn search_postal_codes(&self, fragment: &str, limit: usize) -> Result<Vec<String>, ProviderError> {
            self.hit()?;
            Ok(self
                .codes
                .iter()
                .filter(|c| c.starts_with(fragment))
                .take(limit)
                .cloned()
                .collect())
        }
    }
}
