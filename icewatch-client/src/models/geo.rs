//! Coordinates, map viewport, and position readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within the WGS84 latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Visible coordinate span of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub lat_delta: f64,
    pub lng_delta: f64,
}

impl Span {
    /// Free-roam span used when centering on the user
    pub const DEFAULT: Span = Span {
        lat_delta: 0.05,
        lng_delta: 0.05,
    };

    pub fn new(lat_delta: f64, lng_delta: f64) -> Self {
        Self {
            lat_delta,
            lng_delta,
        }
    }

    /// Half of this span on both axes (zoom in one step)
    pub fn halved(self) -> Span {
        Span {
            lat_delta: self.lat_delta / 2.0,
            lng_delta: self.lng_delta / 2.0,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::DEFAULT
    }
}

/// Map viewport: center plus visible span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: Coordinate,
    pub span: Span,
}

impl Region {
    pub fn new(center: Coordinate, span: Span) -> Self {
        Self { center, span }
    }

    /// Whether a coordinate falls inside the viewport (edges inclusive)
    pub fn contains(&self, point: Coordinate) -> bool {
        (point.lat - self.center.lat).abs() <= self.span.lat_delta / 2.0
            && (point.lng - self.center.lng).abs() <= self.span.lng_delta / 2.0
    }
}

/// A single location reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub captured_at: DateTime<Utc>,
}

impl Position {
    pub fn new(lat: f64, lng: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            lat,
            lng,
            captured_at,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}
