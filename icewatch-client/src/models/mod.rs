//! Data model shared by the client services

pub mod draft;
pub mod geo;
pub mod sighting;

pub use draft::{Draft, DraftField, DraftSighting, LocalImage};
pub use geo::{Coordinate, Position, Region, Span};
pub use sighting::{decode_sightings, DecodedSightings, Sighting, SightingId};
