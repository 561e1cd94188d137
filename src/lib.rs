//! roomhub: client-side core of a room rental marketplace.
//!
//! - [`address`]: postal-code resolution, cascading state/municipality/neighborhood
//!   selection and address validation against the COPOMEX provider.
//! - [`rooms`]: the room-management service contract and the publication form.
//! - [`server`]: JSON API the browser form talks to.

pub mod address;
pub mod config;
pub mod rooms;
pub mod server;
pub mod session;
