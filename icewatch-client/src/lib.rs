//! icewatch-client - sighting synchronization & submission engine
//!
//! Fetches and caches sighting reports, classifies them by recency for map
//! markers, keeps the map viewport, manages location permission and
//! position reads, and submits new reports.
//!
//! A presentation layer renders the state exposed here and forwards user
//! intents; OS facilities come in through the [`platform`] traits.

pub mod config;
pub mod error;
pub mod models;
pub mod platform;
pub mod services;
pub mod session;

pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, ClientResult, FetchError, PositionError, SubmissionError};

use icewatch_common::events::EventBus;
use icewatch_common::{Clock, SystemClock};
use platform::Platform;
use services::{
    Classifier, HttpBackend, PermissionGate, PositionProvider, RegionController, SightingRepository,
    SightingsBackend, SubmissionPipeline,
};
use session::{MapSession, ReportSession};
use std::sync::Arc;

/// Fully wired client: one instance of every core component
#[derive(Clone)]
pub struct IcewatchClient {
    pub config: Arc<ClientConfig>,
    pub event_bus: EventBus,
    pub gate: Arc<PermissionGate>,
    pub positions: Arc<PositionProvider>,
    pub repository: Arc<SightingRepository>,
    pub region: Arc<RegionController>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub classifier: Classifier,
    picker: Arc<dyn platform::ImagePicker>,
}

impl IcewatchClient {
    /// Wire a client that talks HTTP to `config.api_url`
    pub fn new(config: ClientConfig, platform: Platform) -> ClientResult<Self> {
        let backend = HttpBackend::new(&config.api_url, config.request_timeout)
            .map_err(|e| icewatch_common::Error::Config(e.to_string()))?;
        Ok(Self::with_backend(config, platform, Arc::new(backend), Arc::new(SystemClock)))
    }

    /// Wire a client over any backend and clock
    pub fn with_backend(
        config: ClientConfig,
        platform: Platform,
        backend: Arc<dyn SightingsBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let event_bus = EventBus::new(100);

        let gate = Arc::new(PermissionGate::new(
            platform.permissions,
            platform.recovery,
            platform.settings,
            event_bus.clone(),
        ));
        let positions = Arc::new(PositionProvider::new(
            Arc::clone(&gate),
            platform.location,
            Arc::clone(&clock),
            config.fix_timeout,
        ));
        let repository = Arc::new(SightingRepository::new(
            Arc::clone(&backend),
            Arc::clone(&clock),
            event_bus.clone(),
        ));
        let region = Arc::new(RegionController::new(Arc::clone(&positions), event_bus.clone()));
        let pipeline = Arc::new(SubmissionPipeline::new(
            backend,
            Arc::clone(&repository),
            config.device_id.clone(),
            event_bus.clone(),
        ));

        Self {
            config: Arc::new(config),
            event_bus,
            gate,
            positions,
            repository,
            region,
            pipeline,
            classifier: Classifier::new(clock),
            picker: platform.picker,
        }
    }

    /// Session for the map/list screen
    pub fn map_session(&self) -> MapSession {
        MapSession::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.positions),
            Arc::clone(&self.region),
            self.classifier.clone(),
        )
    }

    /// Session for the report screen, with a fresh draft
    pub fn report_session(&self) -> ReportSession {
        ReportSession::new(
            Arc::clone(&self.gate),
            Arc::clone(&self.positions),
            Arc::clone(&self.picker),
            Arc::clone(&self.pipeline),
        )
    }
}
