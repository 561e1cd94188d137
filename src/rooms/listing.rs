//! Publication form: the data a host fills in before a room is created.

use super::types::{Amenity, CreateRoom, RoomError, RoomStatus};
use crate::address::types::is_postal_code;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A listing carries at most this many photos.
pub const MAX_IMAGES: usize = 10;

fn default_amenities() -> Vec<Amenity> {
    Amenity::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub description: String,
    pub price: String,
    /// Every built-in service starts checked.
    #[serde(default = "default_amenities")]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub extra_services: Vec<String>,
    /// Remote URLs or local file paths.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            street: String::new(),
            number: String::new(),
            postal_code: String::new(),
            neighborhood: String::new(),
            city: String::new(),
            state: String::new(),
            description: String::new(),
            price: String::new(),
            amenities: default_amenities(),
            extra_services: Vec::new(),
            images: Vec::new(),
        }
    }
}

impl ListingDraft {
    pub fn set_amenity(&mut self, amenity: Amenity, offered: bool) {
        self.amenities.retain(|a| *a != amenity);
        if offered {
            self.amenities.push(amenity);
        }
    }

    /// Add a free-text service. Blank and duplicate entries are ignored.
    pub fn add_extra_service(&mut self, service: &str) -> bool {
        let service = service.trim();
        if service.is_empty() || self.extra_services.iter().any(|s| s == service) {
            return false;
        }
        self.extra_services.push(service.to_string());
        true
    }

    pub fn remove_extra_service(&mut self, service: &str) {
        self.extra_services.retain(|s| s != service);
    }

    /// Append images up to [`MAX_IMAGES`]; returns how many were accepted.
    pub fn add_images<I>(&mut self, images: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let room = MAX_IMAGES.saturating_sub(self.images.len());
        let before = self.images.len();
        self.images.extend(images.into_iter().take(room));
        self.images.len() - before
    }

    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    /// Split images into remote URLs and local files that must be uploaded.
    pub fn split_images(&self) -> (Vec<String>, Vec<PathBuf>) {
        let mut remote = Vec::new();
        let mut local = Vec::new();
        for image in &self.images {
            if image.starts_with("http://") || image.starts_with("https://") {
                remote.push(image.clone());
            } else {
                local.push(PathBuf::from(image));
            }
        }
        (remote, local)
    }

    /// Build the create payload. New listings start under review.
    pub fn to_create_room(&self, user_id: &str) -> Result<CreateRoom, RoomError> {
        let invalid = |msg: &str| RoomError::InvalidListing(msg.to_string());

        if user_id.trim().is_empty() {
            return Err(invalid("user id is required"));
        }
        if self.street.trim().is_empty() {
            return Err(invalid("street is required"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description is required"));
        }
        if !is_postal_code(self.postal_code.trim()) {
            return Err(invalid("postal code must be exactly 5 digits"));
        }
        if self.images.len() > MAX_IMAGES {
            return Err(RoomError::InvalidListing(format!("at most {} images", MAX_IMAGES)));
        }

        let number: u32 = self
            .number
            .trim()
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid("street number must be a positive integer"))?;

        let price: f64 = self
            .price
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .ok()
            .filter(|p: &f64| p.is_finite() && *p > 0.0)
            .ok_or_else(|| invalid("monthly price must be a positive number"))?;

        let mut services = Vec::new();
        for amenity in Amenity::ALL {
            if self.amenities.contains(&amenity) {
                services.push(amenity);
            }
        }

        let (remote, _) = self.split_images();

        Ok(CreateRoom {
            id_user: user_id.trim().to_string(),
            zone: self.neighborhood.trim().to_string(),
            images: remote,
            description: self.description.trim().to_string(),
            status: RoomStatus::UnderReview,
            price_monthly: price,
            services,
            other_services: self.extra_services.clone(),
            location_street: self.street.trim().to_string(),
            location_number: number,
            location_postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ListingDraft {
        ListingDraft {
            street: "Calle 20".into(),
            number: "104".into(),
            postal_code: "97205".into(),
            neighborhood: "Itzimná".into(),
            city: "Mérida".into(),
            state: "Yucatán".into(),
            description: "Cuarto amplio con baño propio".into(),
            price: "$4,500".into(),
            ..ListingDraft::default()
        }
    }

    #[test]
    fn test_defaults_offer_all_amenities() {
        assert_eq!(ListingDraft::default().amenities.len(), 5);
        let parsed: ListingDraft = serde_json::from_str(
            r#"{"street":"a","number":"1","postal_code":"97205","neighborhood":"n",
                "city":"c","state":"s","description":"d","price":"1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.amenities, Amenity::ALL.to_vec());
    }

    #[test]
    fn test_to_create_room() {
        let mut draft = filled();
        draft.set_amenity(Amenity::AirConditioning, false);
        draft.add_extra_service("Lavandería");
        draft.add_images(vec!["https://cdn.example/a.jpg".to_string(), "fotos/b.jpg".to_string()]);

        let room = draft.to_create_room("u-7").unwrap();
        assert_eq!(room.price_monthly, 4500.0);
        assert_eq!(room.location_number, 104);
        assert_eq!(room.zone, "Itzimná");
        assert_eq!(room.status, RoomStatus::UnderReview);
        assert_eq!(room.services.len(), 4);
        assert!(!room.services.contains(&Amenity::AirConditioning));
        assert_eq!(room.other_services, vec!["Lavandería"]);
        assert_eq!(room.images, vec!["https://cdn.example/a.jpg"]);
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut draft = filled();
        draft.number = "4B".into();
        assert!(matches!(draft.to_create_room("u"), Err(RoomError::InvalidListing(_))));

        let mut draft = filled();
        draft.price = "gratis".into();
        assert!(draft.to_create_room("u").is_err());

        let mut draft = filled();
        draft.postal_code = "9720".into();
        assert!(draft.to_create_room("u").is_err());

        assert!(filled().to_create_room(" ").is_err());
    }

    #[test]
    fn test_extra_services() {
        let mut draft = filled();
        assert!(draft.add_extra_service(" Estacionamiento "));
        assert!(!draft.add_extra_service("Estacionamiento"));
        assert!(!draft.add_extra_service("   "));
        draft.remove_extra_service("Estacionamiento");
        assert!(draft.extra_services.is_empty());
    }

    #[test]
    fn test_image_cap() {
        let mut draft = filled();
        let accepted = draft.add_images((0..8).map(|i| format!("{}.jpg", i)));
        assert_eq!(accepted, 8);
        let accepted = draft.add_images((8..12).map(|i| format!("{}.jpg", i)));
        assert_eq!(accepted, 2);
        assert_eq!(draft.images.len(), MAX_IMAGES);
        assert_eq!(draft.remove_image(0), Some("0.jpg".to_string()));
        assert_eq!(draft.remove_image(42), None);
    }

    #[test]
    fn test_split_images() {
        let mut draft = filled();
        draft.add_images(vec!["http://x/1.png".to_string(), "/tmp/2.png".to_string()]);
        let (remote, local) = draft.split_images();
        assert_eq!(remote, vec!["http://x/1.png"]);
        assert_eq!(local, vec![PathBuf::from("/tmp/2.png")]);
    }
}
