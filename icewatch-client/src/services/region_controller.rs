//! Region controller
//!
//! Sole owner of the map viewport. Last writer wins; there is no merging of
//! concurrent `center_on` / `focus` calls.

use super::position_provider::PositionProvider;
use crate::error::PositionError;
use crate::models::{Position, Region, Sighting, Span};
use icewatch_common::events::{ClientEvent, EventBus};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub struct RegionController {
    region_tx: watch::Sender<Option<Region>>,
    default_span: Span,
    positions: Arc<PositionProvider>,
    event_bus: EventBus,
}

impl RegionController {
    pub fn new(positions: Arc<PositionProvider>, event_bus: EventBus) -> Self {
        Self::with_default_span(positions, Span::DEFAULT, event_bus)
    }

    pub fn with_default_span(
        positions: Arc<PositionProvider>,
        default_span: Span,
        event_bus: EventBus,
    ) -> Self {
        let (region_tx, _) = watch::channel(None);
        Self {
            region_tx,
            default_span,
            positions,
            event_bus,
        }
    }

    /// Current viewport; `None` until the first center/focus
    pub fn current(&self) -> Option<Region> {
        *self.region_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Region>> {
        self.region_tx.subscribe()
    }

    /// Free-roam span
    pub fn default_span(&self) -> Span {
        self.default_span
    }

    /// Span used when zooming in on a selected sighting
    pub fn focus_span(&self) -> Span {
        self.default_span.halved()
    }

    /// Center the viewport on a position with an explicit span
    pub fn center_on(&self, position: &Position, span: Span) -> Region {
        self.set(Region::new(position.coordinate(), span))
    }

    /// Zoom in on a sighting
    pub fn focus(&self, sighting: &Sighting) -> Region {
        debug!(sighting = %sighting.id, "Focusing sighting");
        self.set(Region::new(sighting.coordinate(), self.focus_span()))
    }

    /// Acquire the user's position and center on it with the free-roam span
    pub async fn locate(&self) -> Result<Region, PositionError> {
        let position = self.positions.acquire().await?;
        Ok(self.center_on(&position, self.default_span))
    }

    fn set(&self, region: Region) -> Region {
        self.region_tx.send_replace(Some(region));
        self.event_bus.emit_lossy(ClientEvent::RegionChanged {
            center_lat: region.center.lat,
            center_lng: region.center.lng,
            lat_delta: region.span.lat_delta,
            lng_delta: region.span.lng_delta,
            timestamp: icewatch_common::time::now(),
        });
        region
    }
}
