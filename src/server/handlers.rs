use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::address::{AddressCheck, AddressError, AddressResolver, Autocomplete, PostalCodeRecord, ValidationResult, DEFAULT_SEARCH_LIMIT};
use crate::rooms::{amenity_list, AmenityInfo};

use super::state::AppState;

/// Upper bound on `limit` for postal-code search.
const MAX_SEARCH_LIMIT: usize = 50;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<AddressError> for ApiError {
    fn from(e: AddressError) -> Self {
        let status = match e {
            AddressError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AddressError::NotFound(_) => StatusCode::NOT_FOUND,
            AddressError::LookupFailed(_) | AddressError::Unavailable { .. } => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.to_string())
    }
}

/// Run a blocking resolver call off the async executor.
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AddressResolver) -> T + Send + 'static,
{
    let resolver = state.resolver.clone();
    tokio::task::spawn_blocking(move || f(&resolver))
        .await
        .map_err(|e| {
            error!(error = %e, "resolver task failed");
            ApiError(StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
        })
}

fn log_request(route: &str, detail: &str, outcome: impl std::fmt::Display, start: Instant) {
    info!(
        "GET {} {} -> {} ({:.1}ms)",
        route,
        detail,
        outcome,
        start.elapsed().as_secs_f64() * 1000.0,
    );
}

// ─── Cascading lists ─────────────────────────────────────────────

pub async fn states(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let start = Instant::now();
    let list = blocking(&state, |r| r.list_states()).await?;
    log_request("/api/states", "", format!("{} states", list.len()), start);
    Ok(Json(list))
}

#[derive(Deserialize)]
pub struct MunicipalitiesQuery {
    pub state: Option<String>,
}

pub async fn municipalities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MunicipalitiesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let start = Instant::now();
    let key = params.state.unwrap_or_default();
    let detail = format!("state={}", key);
    let list = blocking(&state, move |r| r.list_municipalities(&key)).await?;
    log_request("/api/municipalities", &detail, list.len(), start);
    Ok(Json(list))
}

#[derive(Deserialize)]
pub struct NeighborhoodsQuery {
    pub municipality: Option<String>,
}

pub async fn neighborhoods(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NeighborhoodsQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let start = Instant::now();
    let key = params.municipality.unwrap_or_default();
    let detail = format!("municipality={}", key);
    let list = blocking(&state, move |r| r.list_neighborhoods(&key)).await?;
    log_request("/api/neighborhoods", &detail, list.len(), start);
    Ok(Json(list))
}

// ─── Postal codes ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search_postal_codes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let start = Instant::now();
    let fragment = params.q.unwrap_or_default();
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
    let detail = format!("q={}", fragment);
    let codes = blocking(&state, move |r| r.search_postal_code_candidates(&fragment, limit)).await?;
    log_request("/api/postal-codes", &detail, codes.len(), start);
    Ok(Json(codes))
}

pub async fn postal_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<PostalCodeRecord>, ApiError> {
    let start = Instant::now();
    let lookup = code.clone();
    let record = blocking(&state, move |r| r.require_postal_code(&lookup)).await??;
    log_request("/api/postal-codes", &code, &record.state, start);
    Ok(Json(record))
}

pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Autocomplete>, ApiError> {
    let start = Instant::now();
    let lookup = code.clone();
    let auto = blocking(&state, move |r| r.autocomplete_from_postal_code(&lookup))
        .await??
        .ok_or_else(|| ApiError::from(AddressError::NotFound(code.clone())))?;
    log_request("/api/postal-codes/autocomplete", &code, auto.neighborhoods.len(), start);
    Ok(Json(auto))
}

// ─── Validation ──────────────────────────────────────────────────

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(check): Json<AddressCheck>,
) -> Result<Json<ValidationResult>, ApiError> {
    let start = Instant::now();
    let detail = format!("postal_code={}", check.postal_code);
    let result = blocking(&state, move |r| r.validate_address(&check)).await?;
    log_request("/api/addresses/validate", &detail, result.valid, start);
    Ok(Json(result))
}

// ─── GET /api/amenities ──────────────────────────────────────────

pub async fn amenities() -> Json<Vec<AmenityInfo>> {
    Json(amenity_list())
}
