//! Room-service data model and response envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Listing availability as the room service spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    #[serde(rename = "Ocupado")]
    Occupied,
    #[serde(rename = "Disponible")]
    Available,
    #[serde(rename = "En revision")]
    UnderReview,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Occupied => "Ocupado",
            Self::Available => "Disponible",
            Self::UnderReview => "En revision",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ocupado" | "occupied" => Ok(Self::Occupied),
            "disponible" | "available" => Ok(Self::Available),
            "en revision" | "en revisión" | "review" | "under-review" => Ok(Self::UnderReview),
            _ => Err(format!("Unknown status '{}'. Use available, occupied or review.", s)),
        }
    }
}

/// Icon shown next to an amenity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Icon {
    Bathtub,
    Wifi,
    Chair,
    Kitchen,
    AcUnit,
}

/// Built-in room services offered as checkboxes on the publication form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amenity {
    #[serde(rename = "Baño")]
    Bathroom,
    #[serde(rename = "Wifi")]
    Wifi,
    #[serde(rename = "Amueblado")]
    Furnished,
    #[serde(rename = "Cocina")]
    Kitchen,
    #[serde(rename = "Clima")]
    AirConditioning,
}

impl Amenity {
    pub const ALL: [Amenity; 5] = [
        Self::Bathroom,
        Self::Wifi,
        Self::Furnished,
        Self::Kitchen,
        Self::AirConditioning,
    ];

    /// Value used on the wire and in query filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bathroom => "Baño",
            Self::Wifi => "Wifi",
            Self::Furnished => "Amueblado",
            Self::Kitchen => "Cocina",
            Self::AirConditioning => "Clima",
        }
    }

    /// Display label on listing pages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bathroom => "Baños",
            Self::Wifi => "Wi-Fi",
            Self::Furnished => "Amueblado",
            Self::Kitchen => "Cocina",
            Self::AirConditioning => "Aire Acondicionado",
        }
    }

    pub fn icon(self) -> Icon {
        match self {
            Self::Bathroom => Icon::Bathtub,
            Self::Wifi => Icon::Wifi,
            Self::Furnished => Icon::Chair,
            Self::Kitchen => Icon::Kitchen,
            Self::AirConditioning => Icon::AcUnit,
        }
    }
}

/// Amenity entry for the public amenity list API.
#[derive(Debug, Clone, Serialize)]
pub struct AmenityInfo {
    pub value: Amenity,
    pub label: &'static str,
    pub icon: Icon,
}

pub fn amenity_list() -> Vec<AmenityInfo> {
    Amenity::ALL
        .iter()
        .map(|&a| AmenityInfo { value: a, label: a.label(), icon: a.icon() })
        .collect()
}

/// Payload for `POST /rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoom {
    pub id_user: String,
    pub zone: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub description: String,
    pub status: RoomStatus,
    pub price_monthly: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Amenity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_services: Vec<String>,
    pub location_street: String,
    pub location_number: u32,
    pub location_postal_code: String,
    pub city: String,
    pub state: String,
}

/// A stored room as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(flatten)]
    pub details: CreateRoom,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for `PUT /rooms/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_monthly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<Amenity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Search filters for `GET /rooms`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomFilters {
    pub city: Option<String>,
    pub state: Option<String>,
    pub zone: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub services: Vec<Amenity>,
    pub status: Option<RoomStatus>,
}

impl RoomFilters {
    /// Query pairs, skipping blank values; `services` repeats its key.
    pub fn to_query(&self, page: u32, limit: u32) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut text = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, v.to_string()));
            }
        };
        text("city", &self.city);
        text("state", &self.state);
        text("zone", &self.zone);

        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        for service in &self.services {
            pairs.push(("services", service.as_str().to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }

        pairs.push(("page", page.to_string()));
        pairs.push(("limit", limit.to_string()));
        pairs
    }
}

/// One page of `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomsPage {
    pub rooms: Vec<Room>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Envelope wrapping every room-service response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Payload of a successful response, or the service's error (else `default_error`).
    pub fn into_data(self, default_error: &str) -> Result<Option<T>, RoomError> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| default_error.to_string());
            return Err(RoomError::Rejected(message));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("Response carried no data")]
    MissingData,
    #[error("Invalid listing: {0}")]
    InvalidListing(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_room_json() -> &'static str {
        r#"{
            "id": "r-1",
            "id_user": "u-7",
            "zone": "Itzimná",
            "images": ["https://cdn.example/r-1/0.jpg"],
            "description": "Cuarto amplio",
            "status": "Disponible",
            "price_monthly": 4500,
            "services": ["Baño", "Wifi"],
            "location_street": "Calle 20",
            "location_number": 104,
            "location_postal_code": "97205",
            "city": "Mérida",
            "state": "Yucatán",
            "created_at": "2025-01-10T12:00:00Z",
            "updated_at": "2025-01-11T08:30:00Z"
        }"#
    }

    #[test]
    fn test_room_decodes_flattened() {
        let room: Room = serde_json::from_str(sample_room_json()).unwrap();
        assert_eq!(room.id, "r-1");
        assert_eq!(room.details.status, RoomStatus::Available);
        assert_eq!(room.details.services, vec![Amenity::Bathroom, Amenity::Wifi]);
        assert!(room.details.other_services.is_empty());
        assert_eq!(room.details.location_number, 104);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&RoomStatus::UnderReview).unwrap(), "\"En revision\"");
        assert_eq!("available".parse::<RoomStatus>().unwrap(), RoomStatus::Available);
        assert!("sold".parse::<RoomStatus>().is_err());
    }

    #[test]
    fn test_amenity_table_is_consistent() {
        for amenity in Amenity::ALL {
            let wire = serde_json::to_string(&amenity).unwrap();
            assert_eq!(wire, format!("\"{}\"", amenity.as_str()));
        }
        assert_eq!(Amenity::AirConditioning.icon(), Icon::AcUnit);
        assert_eq!(amenity_list().len(), 5);
    }

    #[test]
    fn test_filters_query() {
        let filters = RoomFilters {
            city: Some("Mérida".into()),
            state: Some("  ".into()),
            min_price: Some(3000.0),
            services: vec![Amenity::Wifi, Amenity::Kitchen],
            status: Some(RoomStatus::Available),
            ..RoomFilters::default()
        };
        let q = filters.to_query(2, 20);
        assert_eq!(
            q,
            vec![
                ("city", "Mérida".to_string()),
                ("min_price", "3000".to_string()),
                ("services", "Wifi".to_string()),
                ("services", "Cocina".to_string()),
                ("status", "Disponible".to_string()),
                ("page", "2".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_envelope_failure_uses_error_or_default() {
        let with_error: ApiResponse<Room> =
            serde_json::from_str(r#"{"success":false,"message":"","error":"Cuarto no encontrado"}"#).unwrap();
        assert_eq!(with_error.into_data("fallback").unwrap_err().to_string(), "Cuarto no encontrado");

        let bare: ApiResponse<Room> = serde_json::from_str(r#"{"success":false,"message":"x"}"#).unwrap();
        assert_eq!(bare.into_data("failed to fetch room").unwrap_err().to_string(), "failed to fetch room");
    }

    #[test]
    fn test_update_skips_absent_fields() {
        let update = RoomUpdate {
            price_monthly: Some(5000.0),
            status: Some(RoomStatus::Occupied),
            ..RoomUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"status": "Ocupado", "price_monthly": 5000.0}));
    }
}
