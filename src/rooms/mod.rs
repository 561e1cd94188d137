//! Room listings: the room-service contract and the publication form.

pub mod client;
pub mod listing;
pub mod types;

pub use client::{ImagePart, RoomClient, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use listing::{ListingDraft, MAX_IMAGES};
pub use types::{
    amenity_list, Amenity, AmenityInfo, ApiResponse, CreateRoom, Icon, Room, RoomError, RoomFilters,
    RoomStatus, RoomUpdate, RoomsPage,
};
