//! Sighting repository
//!
//! Holds the current snapshot of sightings and replaces it wholesale on each
//! successful refresh.
//!
//! Ordering: every backend request takes a sequence number when it is issued.
//! A result is applied only if its sequence number is newer than the one that
//! produced the current snapshot, so a slow old request can never overwrite
//! fresher data. A failed request leaves the snapshot untouched.

use super::backend_client::SightingsBackend;
use crate::error::FetchError;
use crate::models::{Sighting, SightingId};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use icewatch_common::events::{ClientEvent, EventBus};
use icewatch_common::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

type FetchResult = Result<Arc<Vec<Sighting>>, FetchError>;
type PendingFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Immutable set of sightings from one successful refresh
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    sightings: Arc<Vec<Sighting>>,
    sequence: u64,
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sighting> {
        self.sightings.iter()
    }

    pub fn len(&self) -> usize {
        self.sightings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sightings.is_empty()
    }

    pub fn get(&self, id: &SightingId) -> Option<&Sighting> {
        self.sightings.iter().find(|s| &s.id == id)
    }

    /// Sequence number of the request that produced this snapshot (0 = none yet)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence && self.sightings == other.sightings
    }
}

#[derive(Default)]
struct RefreshState {
    next_sequence: u64,
    applied_sequence: u64,
    reported_failure: u64,
    in_flight: Option<(u64, PendingFetch)>,
}

pub struct SightingRepository {
    backend: Arc<dyn SightingsBackend>,
    snapshot_tx: watch::Sender<Snapshot>,
    state: Mutex<RefreshState>,
    closed: AtomicBool,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
}

impl SightingRepository {
    pub fn new(backend: Arc<dyn SightingsBackend>, clock: Arc<dyn Clock>, event_bus: EventBus) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Self {
            backend,
            snapshot_tx,
            state: Mutex::new(RefreshState::default()),
            closed: AtomicBool::new(false),
            clock,
            event_bus,
        }
    }

    /// Last successful snapshot (empty before the first success)
    pub fn current(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Change notifications for the snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Refresh, joining the in-flight request if there is one
    pub async fn refresh(&self) -> Result<Snapshot, FetchError> {
        let (sequence, pending) = {
            let mut state = self.lock_state();
            match &state.in_flight {
                Some((sequence, pending)) => {
                    debug!(sequence = *sequence, "Joining in-flight refresh");
                    (*sequence, pending.clone())
                }
                None => self.start_request(&mut state),
            }
        };

        self.complete(sequence, pending).await
    }

    /// Refresh with a new request even if one is already in flight
    ///
    /// Used when data older than "now" is not acceptable, e.g. right after a
    /// submission was accepted.
    pub async fn reload(&self) -> Result<Snapshot, FetchError> {
        let (sequence, pending) = {
            let mut state = self.lock_state();
            self.start_request(&mut state)
        };

        self.complete(sequence, pending).await
    }

    /// Stop applying results; anything that resolves afterwards is ignored
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn start_request(&self, state: &mut RefreshState) -> (u64, PendingFetch) {
        state.next_sequence += 1;
        let sequence = state.next_sequence;

        let backend = Arc::clone(&self.backend);
        let pending = async move {
            backend
                .fetch_sightings()
                .await
                .map(Arc::new)
                .map_err(|e| FetchError::new(e.to_string()))
        }
        .boxed()
        .shared();

        debug!(sequence = sequence, "Issuing sightings refresh");
        state.in_flight = Some((sequence, pending.clone()));
        (sequence, pending)
    }

    async fn complete(&self, sequence: u64, pending: PendingFetch) -> Result<Snapshot, FetchError> {
        let mut abandoned = AbandonGuard {
            state: &self.state,
            sequence,
            armed: true,
        };
        let result = pending.await;
        abandoned.armed = false;

        let mut state = self.lock_state();
        if matches!(&state.in_flight, Some((in_flight, _)) if *in_flight == sequence) {
            state.in_flight = None;
        }

        if self.is_closed() {
            debug!(sequence = sequence, "Repository closed, ignoring refresh result");
            return result.map(|_| self.current());
        }

        match result {
            Ok(sightings) => {
                if sequence <= state.applied_sequence {
                    debug!(
                        sequence = sequence,
                        applied = state.applied_sequence,
                        "Discarding superseded refresh result"
                    );
                    return Ok(self.current());
                }

                state.applied_sequence = sequence;
                let snapshot = Snapshot {
                    sightings,
                    sequence,
                    fetched_at: Some(self.clock.now()),
                };
                self.snapshot_tx.send_replace(snapshot.clone());
                drop(state);

                info!(sequence = sequence, count = snapshot.len(), "Sightings snapshot replaced");
                self.event_bus.emit_lossy(ClientEvent::SnapshotReplaced {
                    count: snapshot.len(),
                    sequence,
                    timestamp: self.clock.now(),
                });
                Ok(snapshot)
            }
            Err(err) => {
                // Joined callers share one failure; report it once
                if sequence > state.reported_failure {
                    state.reported_failure = sequence;
                    drop(state);
                    warn!(sequence = sequence, reason = %err.reason, "Sightings refresh failed, keeping previous snapshot");
                    self.event_bus.emit_lossy(ClientEvent::RefreshFailed {
                        reason: err.reason.clone(),
                        timestamp: self.clock.now(),
                    });
                }
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the in-flight slot when a caller is dropped before its request resolves
struct AbandonGuard<'a> {
    state: &'a Mutex<RefreshState>,
    sequence: u64,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(&state.in_flight, Some((in_flight, _)) if *in_flight == self.sequence) {
            debug!(sequence = self.sequence, "Refresh abandoned, releasing in-flight slot");
            state.in_flight = None;
        }
    }
}
