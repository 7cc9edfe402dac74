//! Core services of the sighting engine

pub mod backend_client;
pub mod permission_gate;
pub mod position_provider;
pub mod recency;
pub mod region_controller;
pub mod sighting_repository;
pub mod submission_pipeline;

pub use backend_client::{Acknowledgement, BackendError, HttpBackend, SightingsBackend};
pub use permission_gate::{PermissionGate, SettingsRecovery};
pub use position_provider::PositionProvider;
pub use recency::{classify, Classifier, Tier};
pub use region_controller::RegionController;
pub use sighting_repository::{SightingRepository, Snapshot};
pub use submission_pipeline::{SubmissionPayload, SubmissionPipeline};
