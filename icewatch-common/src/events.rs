//! Event types for the icewatch event system
//!
//! Provides shared event definitions and the EventBus. Components emit
//! events after each state transition; presentation layers subscribe to
//! learn about changes without polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Device capability guarded by an OS permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Location,
    Camera,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Location => write!(f, "location"),
            Capability::Camera => write!(f, "camera"),
        }
    }
}

/// Resolved permission state for one capability
///
/// `Denied` stays terminal until the user changes it in the OS settings.
/// `Restricted` is a platform policy and offers no in-app recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
    Restricted,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Unknown => write!(f, "Unknown"),
            PermissionState::Granted => write!(f, "Granted"),
            PermissionState::Denied => write!(f, "Denied"),
            PermissionState::Restricted => write!(f, "Restricted"),
        }
    }
}

/// Client event types
///
/// Events are broadcast via EventBus and can be serialized for forwarding
/// to a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Repository snapshot replaced by a newer refresh result
    SnapshotReplaced {
        /// Number of sightings in the new snapshot
        count: usize,
        /// Request sequence number that produced the snapshot
        sequence: u64,
        timestamp: DateTime<Utc>,
    },

    /// Refresh failed; the previous snapshot is still current
    RefreshFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Permission state for a capability was (re)resolved
    PermissionChanged {
        capability: Capability,
        state: PermissionState,
        timestamp: DateTime<Utc>,
    },

    /// Map viewport changed
    RegionChanged {
        center_lat: f64,
        center_lng: f64,
        lat_delta: f64,
        lng_delta: f64,
        timestamp: DateTime<Utc>,
    },

    /// Backend acknowledged a new sighting
    SubmissionSucceeded {
        /// Server-assigned id, when the response carried one
        server_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Submission failed; the draft is kept for retry
    SubmissionFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`ClientEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ClientEvent,
    ) -> Result<usize, broadcast::error::SendError<ClientEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
