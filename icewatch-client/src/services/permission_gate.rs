//! Permission gate
//!
//! Wraps the OS permission subsystem. Requests for the same capability are
//! coalesced: while a prompt is on screen, every further caller awaits the
//! same pending answer instead of stacking a second prompt.
//!
//! Recovery from `Denied` is a separate, caller-invoked step
//! ([`PermissionGate::offer_settings_recovery`]).

use crate::platform::{PermissionBackend, RecoveryPrompt, SettingsNavigator};
use futures::future::{BoxFuture, FutureExt, Shared};
use icewatch_common::events::{Capability, ClientEvent, EventBus, PermissionState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

type PendingRequest = Shared<BoxFuture<'static, PermissionState>>;

/// Outcome of offering the settings redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRecovery {
    /// The last request did not end in `Denied`
    NotApplicable,
    /// User chose to stay in the app
    Declined,
    /// The app-settings page was opened
    Opened,
}

/// Permission gate for device capabilities
pub struct PermissionGate {
    backend: Arc<dyn PermissionBackend>,
    recovery: Arc<dyn RecoveryPrompt>,
    settings: Arc<dyn SettingsNavigator>,
    in_flight: Mutex<HashMap<Capability, PendingRequest>>,
    last_known: Mutex<HashMap<Capability, PermissionState>>,
    event_bus: EventBus,
}

impl PermissionGate {
    pub fn new(
        backend: Arc<dyn PermissionBackend>,
        recovery: Arc<dyn RecoveryPrompt>,
        settings: Arc<dyn SettingsNavigator>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            backend,
            recovery,
            settings,
            in_flight: Mutex::new(HashMap::new()),
            last_known: Mutex::new(HashMap::new()),
            event_bus,
        }
    }

    /// Check the current OS state without prompting
    pub async fn query(&self, capability: Capability) -> PermissionState {
        let state = self.backend.status(capability).await;
        self.record(capability, state);
        state
    }

    /// Resolve the capability, prompting the user if needed
    ///
    /// `Granted` and `Restricted` are returned without a prompt.
    pub async fn request(&self, capability: Capability) -> PermissionState {
        let pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(&capability) {
                Some(pending) => {
                    debug!(capability = %capability, "Joining in-flight permission request");
                    pending.clone()
                }
                None => {
                    let backend = Arc::clone(&self.backend);
                    let pending = async move {
                        match backend.status(capability).await {
                            state @ (PermissionState::Granted | PermissionState::Restricted) => state,
                            _ => backend.prompt(capability).await,
                        }
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(capability, pending.clone());
                    pending
                }
            }
        };

        // Released on completion and on cancellation alike
        let slot = InFlightSlot {
            in_flight: &self.in_flight,
            capability,
            pending: pending.clone(),
        };
        let state = pending.await;
        drop(slot);

        self.record(capability, state);
        state
    }

    /// Offer to open the app-settings page after a denial
    ///
    /// Only acts when the last resolution for `capability` was `Denied`.
    pub async fn offer_settings_recovery(&self, capability: Capability) -> SettingsRecovery {
        if self.last_known(capability) != PermissionState::Denied {
            return SettingsRecovery::NotApplicable;
        }

        if self.recovery.confirm_open_settings(capability).await {
            info!(capability = %capability, "Opening app settings for permission recovery");
            self.settings.open_app_settings(capability);
            SettingsRecovery::Opened
        } else {
            debug!(capability = %capability, "Settings recovery declined");
            SettingsRecovery::Declined
        }
    }

    /// Last state observed through `query` or `request`
    pub fn last_known(&self, capability: Capability) -> PermissionState {
        self.last_known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, capability: Capability, state: PermissionState) {
        let previous = self
            .last_known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(capability, state);

        if previous != Some(state) {
            info!(capability = %capability, state = %state, "Permission state changed");
            self.event_bus.emit_lossy(ClientEvent::PermissionChanged {
                capability,
                state,
                timestamp: icewatch_common::time::now(),
            });
        }
    }
}

/// Removes a pending request from the in-flight map when its caller is done with it
struct InFlightSlot<'a> {
    in_flight: &'a Mutex<HashMap<Capability, PendingRequest>>,
    capability: Capability,
    pending: PendingRequest,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight
            .get(&self.capability)
            .is_some_and(|current| current.ptr_eq(&self.pending))
        {
            in_flight.remove(&self.capability);
        }
    }
}
