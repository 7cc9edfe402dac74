//! OS collaborator interfaces
//!
//! The engine never talks to an operating system directly. A host (mobile
//! shell, desktop CLI, test harness) supplies these implementations.

pub mod desktop;

use crate::models::LocalImage;
use async_trait::async_trait;
use icewatch_common::events::{Capability, PermissionState};
use std::sync::Arc;
use thiserror::Error;

/// OS permission subsystem
///
/// Implementations map their own failures to `Denied` or `Restricted`.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Current status without prompting
    async fn status(&self, capability: Capability) -> PermissionState;

    /// Show the OS prompt and wait for the user's answer
    async fn prompt(&self, capability: Capability) -> PermissionState;
}

/// Asks the user whether to leave the app for the settings page
#[async_trait]
pub trait RecoveryPrompt: Send + Sync {
    async fn confirm_open_settings(&self, capability: Capability) -> bool;
}

/// Opens the platform's app-specific settings page
pub trait SettingsNavigator: Send + Sync {
    fn open_app_settings(&self, capability: Capability);
}

/// Raw location fix from the OS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("location services are turned off")]
    ServicesDisabled,

    #[error("{0}")]
    Unavailable(String),
}

/// Single-shot OS location reading
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn current_fix(&self) -> Result<Fix, LocationError>;
}

/// Where a picked image comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Library,
    Camera,
}

/// OS camera / gallery picker. `None` means the user cancelled.
#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick(&self, source: ImageSource) -> Option<LocalImage>;
}

/// The full set of OS collaborators a client needs
#[derive(Clone)]
pub struct Platform {
    pub permissions: Arc<dyn PermissionBackend>,
    pub recovery: Arc<dyn RecoveryPrompt>,
    pub settings: Arc<dyn SettingsNavigator>,
    pub location: Arc<dyn LocationService>,
    pub picker: Arc<dyn ImagePicker>,
}
