//! Submission pipeline
//!
//! Validates a draft, encodes it into a transport payload exactly once, and
//! posts it. Nothing is retried automatically: on failure the draft is left
//! as it was so the caller can fix it and submit again.

use super::backend_client::{Acknowledgement, SightingsBackend};
use super::sighting_repository::SightingRepository;
use crate::error::SubmissionError;
use crate::models::{Draft, LocalImage, Position};
use icewatch_common::events::{ClientEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Wire payload for a new sighting
///
/// Built only by the pipeline; read only by backend implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub(crate) description: String,
    pub(crate) lat: f64,
    pub(crate) lng: f64,
    pub(crate) device_id: String,
    pub(crate) image: Vec<u8>,
}

impl SubmissionPayload {
    fn encode(description: &str, position: &Position, device_id: &str, image: Vec<u8>) -> Self {
        Self {
            description: description.trim().to_string(),
            lat: position.lat,
            lng: position.lng,
            device_id: device_id.to_string(),
            image,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

pub struct SubmissionPipeline {
    backend: Arc<dyn SightingsBackend>,
    repository: Arc<SightingRepository>,
    device_id: String,
    event_bus: EventBus,
}

impl SubmissionPipeline {
    pub fn new(
        backend: Arc<dyn SightingsBackend>,
        repository: Arc<SightingRepository>,
        device_id: impl Into<String>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            backend,
            repository,
            device_id: device_id.into(),
            event_bus,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Submit a draft
    ///
    /// On success the draft is cleared and the repository reloaded so the new
    /// sighting shows up. A failed reload is logged and does not turn the
    /// accepted submission into a failure.
    pub async fn submit(&self, draft: &Draft) -> Result<Acknowledgement, SubmissionError> {
        let guard = draft.begin_submit().ok_or_else(|| {
            debug!("Rejecting submit: draft already in flight");
            SubmissionError::AlreadySubmitting
        })?;

        let contents = draft.snapshot();
        let missing = contents.missing_fields();
        if !missing.is_empty() {
            debug!(missing = ?missing, "Rejecting incomplete draft");
            return Err(SubmissionError::Validation { missing });
        }
        let (Some(image), Some(position)) = (&contents.image, &contents.position) else {
            return Err(SubmissionError::Validation { missing });
        };

        let image_bytes = read_image(image).await.map_err(|reason| self.failed(reason))?;
        let payload = SubmissionPayload::encode(&contents.description, position, &self.device_id, image_bytes);

        debug!(
            lat = payload.lat,
            lng = payload.lng,
            image_bytes = payload.image.len(),
            "Submitting sighting"
        );

        let ack = self
            .backend
            .post_sighting(payload)
            .await
            .map_err(|e| self.failed(e.to_string()))?;

        draft.clear_submitted(&contents);
        drop(guard);

        info!(
            status = ack.status,
            server_id = ?ack.server_id.as_ref().map(|id| id.as_str()),
            "Sighting submitted"
        );
        self.event_bus.emit_lossy(ClientEvent::SubmissionSucceeded {
            server_id: ack.server_id.as_ref().map(|id| id.to_string()),
            timestamp: icewatch_common::time::now(),
        });

        if let Err(e) = self.repository.reload().await {
            warn!(error = %e, "Refresh after submission failed");
        }

        Ok(ack)
    }

    fn failed(&self, reason: String) -> SubmissionError {
        warn!(reason = %reason, "Sighting submission failed, draft kept");
        self.event_bus.emit_lossy(ClientEvent::SubmissionFailed {
            reason: reason.clone(),
            timestamp: icewatch_common::time::now(),
        });
        SubmissionError::Submit { reason }
    }
}

async fn read_image(image: &LocalImage) -> Result<Vec<u8>, String> {
    let bytes = image
        .read()
        .await
        .map_err(|e| format!("could not read image {}: {}", image.path().display(), e))?;

    if bytes.is_empty() {
        return Err(format!("image {} is empty", image.path().display()));
    }

    Ok(bytes)
}
