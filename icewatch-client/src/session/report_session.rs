//! Report screen session
//!
//! Owns one draft for the lifetime of the report flow and forwards the
//! user's intents to the permission gate, position provider, image picker
//! and submission pipeline.

use crate::error::{PositionError, SubmissionError};
use crate::models::{Draft, DraftSighting, LocalImage, Position};
use crate::platform::{ImagePicker, ImageSource};
use crate::services::{Acknowledgement, PermissionGate, PositionProvider, SettingsRecovery, SubmissionPipeline};
use icewatch_common::events::{Capability, PermissionState};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of an image pick
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Picked(LocalImage),
    Cancelled,
    /// Camera permission not granted
    NotPermitted(PermissionState),
}

pub struct ReportSession {
    draft: Draft,
    gate: Arc<PermissionGate>,
    positions: Arc<PositionProvider>,
    picker: Arc<dyn ImagePicker>,
    pipeline: Arc<SubmissionPipeline>,
}

impl ReportSession {
    pub fn new(
        gate: Arc<PermissionGate>,
        positions: Arc<PositionProvider>,
        picker: Arc<dyn ImagePicker>,
        pipeline: Arc<SubmissionPipeline>,
    ) -> Self {
        Self {
            draft: Draft::new(),
            gate,
            positions,
            picker,
            pipeline,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn contents(&self) -> DraftSighting {
        self.draft.snapshot()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.draft.set_description(description);
    }

    /// Pick a photo; the camera needs its permission first
    pub async fn pick_image(&self, source: ImageSource) -> PickOutcome {
        if source == ImageSource::Camera {
            let state = self.gate.request(Capability::Camera).await;
            if state != PermissionState::Granted {
                return PickOutcome::NotPermitted(state);
            }
        }

        match self.picker.pick(source).await {
            Some(image) => {
                debug!(path = %image.path().display(), "Image picked");
                self.draft.set_image(image.clone());
                PickOutcome::Picked(image)
            }
            None => PickOutcome::Cancelled,
        }
    }

    /// Stamp the draft with the current position
    ///
    /// A denial offers the settings redirect before the error is returned.
    pub async fn capture_position(&self) -> Result<Position, PositionError> {
        match self.positions.acquire().await {
            Ok(position) => {
                self.draft.set_position(position);
                Ok(position)
            }
            Err(PositionError::PermissionDenied) => {
                let recovery = self.gate.offer_settings_recovery(Capability::Location).await;
                if recovery == SettingsRecovery::Opened {
                    info!("User sent to settings to grant location access");
                }
                Err(PositionError::PermissionDenied)
            }
            Err(e) => Err(e),
        }
    }

    /// Submission is offered once a position has been captured
    pub fn can_submit(&self) -> bool {
        self.draft.snapshot().position.is_some() && !self.draft.is_submitting()
    }

    pub async fn submit(&self) -> Result<Acknowledgement, SubmissionError> {
        self.pipeline.submit(&self.draft).await
    }

    /// Leaving the report screen discards the draft
    pub fn discard(&self) {
        self.draft.clear();
    }
}
