//! Position provider
//!
//! Single-shot position acquisition behind the location permission. Every
//! call performs a fresh read; nothing is cached between calls.

use super::permission_gate::PermissionGate;
use crate::error::PositionError;
use crate::models::{Coordinate, Position};
use crate::platform::LocationService;
use icewatch_common::events::{Capability, PermissionState};
use icewatch_common::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time allowed for the OS to produce a fix
pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(15);

pub struct PositionProvider {
    gate: Arc<PermissionGate>,
    location: Arc<dyn LocationService>,
    clock: Arc<dyn Clock>,
    fix_timeout: Duration,
}

impl PositionProvider {
    pub fn new(
        gate: Arc<PermissionGate>,
        location: Arc<dyn LocationService>,
        clock: Arc<dyn Clock>,
        fix_timeout: Duration,
    ) -> Self {
        Self {
            gate,
            location,
            clock,
            fix_timeout,
        }
    }

    /// Acquire the current position
    ///
    /// Requests location permission first (prompting if needed).
    pub async fn acquire(&self) -> Result<Position, PositionError> {
        match self.gate.request(Capability::Location).await {
            PermissionState::Granted => {}
            PermissionState::Restricted => return Err(PositionError::PermissionRestricted),
            PermissionState::Denied | PermissionState::Unknown => {
                return Err(PositionError::PermissionDenied)
            }
        }

        let fix = tokio::time::timeout(self.fix_timeout, self.location.current_fix())
            .await
            .map_err(|_| {
                warn!(timeout = ?self.fix_timeout, "Position fix timed out");
                PositionError::PositionUnavailable(format!(
                    "no fix within {}s",
                    self.fix_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                warn!(error = %e, "Location service failed");
                PositionError::PositionUnavailable(e.to_string())
            })?;

        if !Coordinate::new(fix.lat, fix.lng).is_valid() {
            return Err(PositionError::PositionUnavailable(format!(
                "invalid fix ({}, {})",
                fix.lat, fix.lng
            )));
        }

        let position = Position::new(fix.lat, fix.lng, self.clock.now());
        debug!(lat = position.lat, lng = position.lng, "Position acquired");
        Ok(position)
    }

    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }
}
