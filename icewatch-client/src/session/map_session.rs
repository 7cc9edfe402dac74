//! Map screen session
//!
//! Drives the list/map view: activation, refresh and "go to me" intents,
//! marker derivation, and selection. Once the session is deactivated, results
//! that arrive late are not applied to the viewport.

use crate::error::{FetchError, PositionError};
use crate::models::{Position, Region, Sighting, SightingId};
use crate::services::{Classifier, PositionProvider, RegionController, SightingRepository, Snapshot, Tier};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A sighting with its presentation tier for this render pass
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub sighting: Sighting,
    pub tier: Tier,
}

/// What happened during activation
#[derive(Debug)]
pub struct Activation {
    pub sightings: Result<Snapshot, FetchError>,
    pub position: Result<Position, PositionError>,
    /// Viewport set from the position; `None` if unavailable or torn down meanwhile
    pub region: Option<Region>,
}

pub struct MapSession {
    repository: Arc<SightingRepository>,
    positions: Arc<PositionProvider>,
    region: Arc<RegionController>,
    classifier: Classifier,
    lifetime: Mutex<CancellationToken>,
}

impl MapSession {
    pub fn new(
        repository: Arc<SightingRepository>,
        positions: Arc<PositionProvider>,
        region: Arc<RegionController>,
        classifier: Classifier,
    ) -> Self {
        let lifetime = CancellationToken::new();
        lifetime.cancel();
        Self {
            repository,
            positions,
            region,
            classifier,
            lifetime: Mutex::new(lifetime),
        }
    }

    /// Screen gained focus: refresh and locate concurrently, then set the viewport
    pub async fn activate(&self) -> Activation {
        let token = {
            let mut lifetime = self.lifetime.lock().unwrap_or_else(|e| e.into_inner());
            if lifetime.is_cancelled() {
                *lifetime = CancellationToken::new();
            }
            lifetime.clone()
        };

        let (sightings, position) = tokio::join!(self.repository.refresh(), self.positions.acquire());

        let region = match &position {
            Ok(position) if !token.is_cancelled() => {
                Some(self.region.center_on(position, self.region.default_span()))
            }
            Ok(_) => {
                debug!("Session torn down before activation finished, viewport untouched");
                None
            }
            Err(_) => None,
        };

        info!(
            sightings = sightings.as_ref().map(|s| s.len()).ok(),
            located = position.is_ok(),
            "Map session activated"
        );

        Activation {
            sightings,
            position,
            region,
        }
    }

    /// Screen lost focus
    pub fn deactivate(&self) {
        self.lifetime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }

    pub fn is_active(&self) -> bool {
        !self
            .lifetime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_cancelled()
    }

    /// Refresh intent
    pub async fn refresh(&self) -> Result<Snapshot, FetchError> {
        self.repository.refresh().await
    }

    /// "Go to me" intent
    ///
    /// The viewport is only moved if the session is still active when the
    /// position arrives.
    pub async fn locate_me(&self) -> Result<Option<Region>, PositionError> {
        let token = self.token();
        let position = self.positions.acquire().await?;
        if token.is_cancelled() {
            debug!("Session torn down before locate finished, viewport untouched");
            return Ok(None);
        }
        Ok(Some(self.region.center_on(&position, self.region.default_span())))
    }

    /// Markers for the current snapshot, classified against the clock right now
    pub fn markers(&self) -> Vec<Marker> {
        self.repository
            .current()
            .iter()
            .map(|sighting| Marker {
                tier: self.classifier.classify(sighting),
                sighting: sighting.clone(),
            })
            .collect()
    }

    /// Select a list item or marker; zooms the viewport in on it
    pub fn select(&self, id: &SightingId) -> Option<Region> {
        let snapshot = self.repository.current();
        let sighting = snapshot.get(id)?;
        Some(self.region.focus(sighting))
    }

    pub fn region(&self) -> Option<Region> {
        self.region.current()
    }

    fn token(&self) -> CancellationToken {
        self.lifetime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
