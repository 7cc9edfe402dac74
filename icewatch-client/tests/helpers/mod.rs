//! Test doubles and fixtures for icewatch-client integration tests
//!
//! Every OS collaborator and the backend are scripted in memory so tests can
//! control timing (gated responses) and observe calls (counters).

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use icewatch_client::config::ClientConfig;
use icewatch_client::models::{LocalImage, Sighting, SightingId};
use icewatch_client::platform::{
    Fix, ImagePicker, ImageSource, LocationError, LocationService, PermissionBackend, Platform,
    RecoveryPrompt, SettingsNavigator,
};
use icewatch_client::services::{Acknowledgement, BackendError, SightingsBackend, SubmissionPayload};
use icewatch_client::IcewatchClient;
use icewatch_common::events::{Capability, PermissionState};
use icewatch_common::FixedClock;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

pub const DEVICE_ID: &str = "test-device";

/// Minimal PNG header followed by filler bytes
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDRfake-image-data";

/// Fixed "now" for every test: 2024-01-15T12:00:00Z
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Sighting reported `minutes_ago` before [`t0`]
pub fn sighting(id: &str, lat: f64, lng: f64, minutes_ago: i64) -> Sighting {
    Sighting {
        id: SightingId::new(id),
        description: format!("ice at {}", id),
        lat,
        lng,
        timestamp: t0() - ChronoDuration::minutes(minutes_ago),
        image_url: None,
        device_id: None,
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Backend
// ============================================================================

type FetchOutcome = Result<Vec<Sighting>, BackendError>;

enum FetchScript {
    Ready(FetchOutcome),
    Gated(oneshot::Receiver<FetchOutcome>),
}

/// In-memory sightings backend
///
/// Fetches consume scripted responses in call order; once the script is
/// exhausted they return the listed sightings. Accepted posts are appended
/// to that list.
#[derive(Default)]
pub struct ScriptedBackend {
    listed: Mutex<Vec<Sighting>>,
    fetch_script: Mutex<VecDeque<FetchScript>>,
    fetch_calls: AtomicUsize,
    post_failure: Mutex<Option<BackendError>>,
    post_gate: Mutex<Option<oneshot::Receiver<()>>>,
    post_calls: AtomicUsize,
    payloads: Mutex<Vec<SubmissionPayload>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sightings(sightings: Vec<Sighting>) -> Self {
        let backend = Self::default();
        *backend.listed.lock().unwrap() = sightings;
        backend
    }

    pub fn set_sightings(&self, sightings: Vec<Sighting>) {
        *self.listed.lock().unwrap() = sightings;
    }

    /// Next unscripted fetch returns `outcome` immediately
    pub fn push_fetch(&self, outcome: FetchOutcome) {
        self.fetch_script
            .lock()
            .unwrap()
            .push_back(FetchScript::Ready(outcome));
    }

    /// Next unscripted fetch waits until the returned sender fires
    pub fn gate_fetch(&self) -> oneshot::Sender<FetchOutcome> {
        let (tx, rx) = oneshot::channel();
        self.fetch_script
            .lock()
            .unwrap()
            .push_back(FetchScript::Gated(rx));
        tx
    }

    pub fn fail_posts(&self, error: BackendError) {
        *self.post_failure.lock().unwrap() = Some(error);
    }

    pub fn accept_posts(&self) {
        *self.post_failure.lock().unwrap() = None;
    }

    /// Next post waits until the returned sender fires
    pub fn gate_post(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.post_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SightingsBackend for ScriptedBackend {
    async fn fetch_sightings(&self) -> Result<Vec<Sighting>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let script = self.fetch_script.lock().unwrap().pop_front();
        match script {
            Some(FetchScript::Ready(outcome)) => outcome,
            Some(FetchScript::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(BackendError::NetworkError("gate dropped".to_string()))),
            None => Ok(self.listed.lock().unwrap().clone()),
        }
    }

    async fn post_sighting(&self, payload: SubmissionPayload) -> Result<Acknowledgement, BackendError> {
        let call = self.post_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let gate = self.post_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(error) = self.post_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let id = format!("new-{}", call);
        self.listed.lock().unwrap().push(Sighting {
            id: SightingId::new(id.clone()),
            description: payload.description().to_string(),
            lat: payload.lat(),
            lng: payload.lng(),
            timestamp: t0(),
            image_url: Some(format!("https://images.example.org/{}.png", id)),
            device_id: Some(payload.device_id().to_string()),
        });
        self.payloads.lock().unwrap().push(payload);

        Ok(Acknowledgement {
            status: 201,
            server_id: Some(SightingId::new(id)),
        })
    }
}

// ============================================================================
// Platform doubles
// ============================================================================

/// Permission subsystem with a fixed status and a scripted prompt answer
pub struct ScriptedPermissions {
    status: Mutex<PermissionState>,
    answer: Mutex<PermissionState>,
    prompt_delay: Mutex<Duration>,
    prompts: AtomicUsize,
}

impl ScriptedPermissions {
    pub fn new(status: PermissionState, answer: PermissionState) -> Self {
        Self {
            status: Mutex::new(status),
            answer: Mutex::new(answer),
            prompt_delay: Mutex::new(Duration::ZERO),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, PermissionState::Granted)
    }

    pub fn set_status(&self, status: PermissionState) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_answer(&self, answer: PermissionState) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn set_prompt_delay(&self, delay: Duration) {
        *self.prompt_delay.lock().unwrap() = delay;
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for ScriptedPermissions {
    async fn status(&self, _capability: Capability) -> PermissionState {
        *self.status.lock().unwrap()
    }

    async fn prompt(&self, _capability: Capability) -> PermissionState {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.prompt_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let answer = *self.answer.lock().unwrap();
        *self.status.lock().unwrap() = answer;
        answer
    }
}

/// Recovery dialog with a scripted answer
pub struct ScriptedRecovery {
    accept: Mutex<bool>,
    asked: AtomicUsize,
}

impl ScriptedRecovery {
    pub fn new(accept: bool) -> Self {
        Self {
            accept: Mutex::new(accept),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        *self.accept.lock().unwrap() = accept;
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryPrompt for ScriptedRecovery {
    async fn confirm_open_settings(&self, _capability: Capability) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        *self.accept.lock().unwrap()
    }
}

/// Records every settings-page open
#[derive(Default)]
pub struct RecordingSettings {
    opened: Mutex<Vec<Capability>>,
}

impl RecordingSettings {
    pub fn opened(&self) -> Vec<Capability> {
        self.opened.lock().unwrap().clone()
    }
}

impl SettingsNavigator for RecordingSettings {
    fn open_app_settings(&self, capability: Capability) {
        self.opened.lock().unwrap().push(capability);
    }
}

/// Location service with a scripted fix and optional latency
pub struct ScriptedLocation {
    result: Mutex<Result<Fix, LocationError>>,
    delay: Mutex<Duration>,
    reads: AtomicUsize,
}

impl ScriptedLocation {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            result: Mutex::new(Ok(Fix { lat, lng })),
            delay: Mutex::new(Duration::ZERO),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set_fix(&self, lat: f64, lng: f64) {
        *self.result.lock().unwrap() = Ok(Fix { lat, lng });
    }

    pub fn fail(&self, error: LocationError) {
        *self.result.lock().unwrap() = Err(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationService for ScriptedLocation {
    async fn current_fix(&self) -> Result<Fix, LocationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().unwrap().clone()
    }
}

/// Picker that returns a preset image (or cancels when unset)
#[derive(Default)]
pub struct ScriptedPicker {
    image: Mutex<Option<LocalImage>>,
    sources: Mutex<Vec<ImageSource>>,
}

impl ScriptedPicker {
    pub fn set_image(&self, image: Option<LocalImage>) {
        *self.image.lock().unwrap() = image;
    }

    pub fn sources(&self) -> Vec<ImageSource> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImagePicker for ScriptedPicker {
    async fn pick(&self, source: ImageSource) -> Option<LocalImage> {
        self.sources.lock().unwrap().push(source);
        self.image.lock().unwrap().clone()
    }
}

// ============================================================================
// Fully wired client
// ============================================================================

/// A client over scripted collaborators, with handles to each of them
pub struct Harness {
    pub client: IcewatchClient,
    pub backend: Arc<ScriptedBackend>,
    pub permissions: Arc<ScriptedPermissions>,
    pub recovery: Arc<ScriptedRecovery>,
    pub settings: Arc<RecordingSettings>,
    pub location: Arc<ScriptedLocation>,
    pub picker: Arc<ScriptedPicker>,
    pub clock: Arc<FixedClock>,
    pub image_path: PathBuf,
    _temp_dir: TempDir,
}

impl Harness {
    /// Granted permissions, a fix at (12, 34), no listed sightings
    pub fn new() -> Self {
        Self::with(ScriptedBackend::new(), ScriptedPermissions::granted())
    }

    pub fn with(backend: ScriptedBackend, permissions: ScriptedPermissions) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let image_path = temp_dir.path().join("photo.png");
        std::fs::write(&image_path, PNG_BYTES).unwrap();

        let backend = Arc::new(backend);
        let permissions = Arc::new(permissions);
        let recovery = Arc::new(ScriptedRecovery::new(false));
        let settings = Arc::new(RecordingSettings::default());
        let location = Arc::new(ScriptedLocation::at(12.0, 34.0));
        let picker = Arc::new(ScriptedPicker::default());
        picker.set_image(Some(LocalImage::new(image_path.clone())));
        let clock = Arc::new(FixedClock::new(t0()));

        let platform = Platform {
            permissions: permissions.clone(),
            recovery: recovery.clone(),
            settings: settings.clone(),
            location: location.clone(),
            picker: picker.clone(),
        };

        let mut config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        config.device_id = DEVICE_ID.to_string();
        config.fix_timeout = Duration::from_millis(200);

        let client = IcewatchClient::with_backend(config, platform, backend.clone(), clock.clone());

        Self {
            client,
            backend,
            permissions,
            recovery,
            settings,
            location,
            picker,
            clock,
            image_path,
            _temp_dir: temp_dir,
        }
    }
}
