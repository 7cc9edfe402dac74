//! Desktop platform used by the `icewatch` CLI
//!
//! A desktop session has no OS permission prompts and no GPS. Location comes
//! from the command line and images from file paths.

use super::{
    Fix, ImagePicker, ImageSource, LocationError, LocationService, PermissionBackend, Platform,
    RecoveryPrompt, SettingsNavigator,
};
use crate::models::{Coordinate, LocalImage};
use async_trait::async_trait;
use icewatch_common::events::{Capability, PermissionState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Every capability is granted
pub struct GrantedPermissions;

#[async_trait]
impl PermissionBackend for GrantedPermissions {
    async fn status(&self, _capability: Capability) -> PermissionState {
        PermissionState::Granted
    }

    async fn prompt(&self, _capability: Capability) -> PermissionState {
        PermissionState::Granted
    }
}

/// Never leaves the app for settings
pub struct DeclineRecovery;

#[async_trait]
impl RecoveryPrompt for DeclineRecovery {
    async fn confirm_open_settings(&self, _capability: Capability) -> bool {
        false
    }
}

/// Logs instead of opening a settings page
pub struct LogSettingsNavigator;

impl SettingsNavigator for LogSettingsNavigator {
    fn open_app_settings(&self, capability: Capability) {
        warn!(capability = %capability, "Open the system settings to change this permission");
    }
}

/// Location supplied up front; `None` reports the fix as unavailable
pub struct StaticLocation {
    coordinate: Option<Coordinate>,
}

impl StaticLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationService for StaticLocation {
    async fn current_fix(&self) -> Result<Fix, LocationError> {
        self.coordinate
            .map(|c| Fix { lat: c.lat, lng: c.lng })
            .ok_or_else(|| LocationError::Unavailable("no location given (use --lat/--lng)".to_string()))
    }
}

/// Picks a fixed file; cancelled when none was given or the file is missing
pub struct FileImagePicker {
    path: Option<PathBuf>,
}

impl FileImagePicker {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ImagePicker for FileImagePicker {
    async fn pick(&self, _source: ImageSource) -> Option<LocalImage> {
        let path = self.path.as_ref()?;
        if tokio::fs::metadata(path).await.is_err() {
            warn!(path = %path.display(), "Image file not found");
            return None;
        }
        Some(LocalImage::new(path.clone()))
    }
}

/// Assemble the desktop platform
pub fn desktop_platform(location: Option<Coordinate>, image: Option<PathBuf>) -> Platform {
    Platform {
        permissions: Arc::new(GrantedPermissions),
        recovery: Arc::new(DeclineRecovery),
        settings: Arc::new(LogSettingsNavigator),
        location: Arc::new(StaticLocation::new(location)),
        picker: Arc::new(FileImagePicker::new(image)),
    }
}
