//! Permission gate and position provider integration tests

mod helpers;

use helpers::{Harness, ScriptedBackend, ScriptedPermissions};
use icewatch_client::error::PositionError;
use icewatch_client::platform::LocationError;
use icewatch_client::services::SettingsRecovery;
use icewatch_common::events::{Capability, ClientEvent, PermissionState};
use std::time::Duration;

fn harness(status: PermissionState, answer: PermissionState) -> Harness {
    Harness::with(ScriptedBackend::new(), ScriptedPermissions::new(status, answer))
}

// ============================================================================
// Permission gate
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_share_one_prompt() {
    let h = harness(PermissionState::Unknown, PermissionState::Granted);
    h.permissions.set_prompt_delay(Duration::from_millis(50));
    let gate = &h.client.gate;

    let (a, b, c) = tokio::join!(
        gate.request(Capability::Location),
        gate.request(Capability::Location),
        gate.request(Capability::Location),
    );

    assert_eq!([a, b, c], [PermissionState::Granted; 3]);
    assert_eq!(h.permissions.prompts(), 1, "only one OS prompt may be shown");

    // Resolved: a later request sees Granted without prompting again
    assert_eq!(gate.request(Capability::Location).await, PermissionState::Granted);
    assert_eq!(h.permissions.prompts(), 1);
}

#[tokio::test]
async fn test_cancelled_request_does_not_strand_later_ones() {
    let h = harness(PermissionState::Unknown, PermissionState::Granted);
    h.permissions.set_prompt_delay(Duration::from_secs(5));
    let gate = &h.client.gate;

    let cancelled = tokio::time::timeout(Duration::from_millis(20), gate.request(Capability::Location)).await;
    assert!(cancelled.is_err());

    h.permissions.set_prompt_delay(Duration::ZERO);
    let state = tokio::time::timeout(Duration::from_millis(500), gate.request(Capability::Location))
        .await
        .expect("a new request must prompt again");

    assert_eq!(state, PermissionState::Granted);
    assert_eq!(h.permissions.prompts(), 2);
}

#[tokio::test]
async fn test_capabilities_are_prompted_independently() {
    let h = harness(PermissionState::Unknown, PermissionState::Granted);
    h.permissions.set_prompt_delay(Duration::from_millis(20));
    let gate = &h.client.gate;

    let (location, camera) = tokio::join!(
        gate.request(Capability::Location),
        gate.request(Capability::Camera),
    );

    assert_eq!(location, PermissionState::Granted);
    assert_eq!(camera, PermissionState::Granted);
    assert_eq!(h.permissions.prompts(), 2);
}

#[tokio::test]
async fn test_restricted_is_returned_without_prompt() {
    let h = harness(PermissionState::Restricted, PermissionState::Granted);

    let state = h.client.gate.request(Capability::Location).await;

    assert_eq!(state, PermissionState::Restricted);
    assert_eq!(h.permissions.prompts(), 0);
    assert_eq!(
        h.client.gate.offer_settings_recovery(Capability::Location).await,
        SettingsRecovery::NotApplicable
    );
    assert_eq!(h.recovery.asked(), 0);
}

#[tokio::test]
async fn test_query_does_not_prompt() {
    let h = harness(PermissionState::Unknown, PermissionState::Granted);

    assert_eq!(h.client.gate.query(Capability::Camera).await, PermissionState::Unknown);
    assert_eq!(h.permissions.prompts(), 0);
}

#[tokio::test]
async fn test_denied_offers_settings_recovery() {
    let h = harness(PermissionState::Unknown, PermissionState::Denied);
    h.recovery.set_accept(true);

    assert_eq!(h.client.gate.request(Capability::Location).await, PermissionState::Denied);
    assert!(h.settings.opened().is_empty(), "request alone never leaves the app");

    let recovery = h.client.gate.offer_settings_recovery(Capability::Location).await;

    assert_eq!(recovery, SettingsRecovery::Opened);
    assert_eq!(h.settings.opened(), vec![Capability::Location]);
}

#[tokio::test]
async fn test_declined_recovery_stays_in_app() {
    let h = harness(PermissionState::Denied, PermissionState::Denied);

    h.client.gate.request(Capability::Location).await;
    let recovery = h.client.gate.offer_settings_recovery(Capability::Location).await;

    assert_eq!(recovery, SettingsRecovery::Declined);
    assert_eq!(h.recovery.asked(), 1);
    assert!(h.settings.opened().is_empty());
}

#[tokio::test]
async fn test_permission_change_is_broadcast_once() {
    let h = harness(PermissionState::Unknown, PermissionState::Granted);
    let mut events = h.client.event_bus.subscribe();

    h.client.gate.request(Capability::Location).await;
    h.client.gate.request(Capability::Location).await;

    match events.try_recv() {
        Ok(ClientEvent::PermissionChanged {
            capability, state, ..
        }) => {
            assert_eq!(capability, Capability::Location);
            assert_eq!(state, PermissionState::Granted);
        }
        other => panic!("expected PermissionChanged, got {:?}", other),
    }
    assert!(events.try_recv().is_err(), "unchanged state must not be re-broadcast");
}

// ============================================================================
// Position provider
// ============================================================================

#[tokio::test]
async fn test_acquire_denied_does_not_read_location() {
    let h = harness(PermissionState::Unknown, PermissionState::Denied);

    let result = h.client.positions.acquire().await;

    assert_eq!(result, Err(PositionError::PermissionDenied));
    assert_eq!(h.location.reads(), 0);
}

#[tokio::test]
async fn test_acquire_restricted() {
    let h = harness(PermissionState::Restricted, PermissionState::Granted);

    let result = h.client.positions.acquire().await;

    assert_eq!(result, Err(PositionError::PermissionRestricted));
    assert_eq!(h.location.reads(), 0);
}

#[tokio::test]
async fn test_acquire_times_out() {
    let h = Harness::new();
    h.location.set_delay(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let result = h.client.positions.acquire().await;

    assert!(matches!(result, Err(PositionError::PositionUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_acquire_with_services_off() {
    let h = Harness::new();
    h.location.fail(LocationError::ServicesDisabled);

    match h.client.positions.acquire().await {
        Err(PositionError::PositionUnavailable(reason)) => {
            assert_eq!(reason, "location services are turned off")
        }
        other => panic!("expected PositionUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_acquire_rejects_out_of_range_fix() {
    let h = Harness::new();
    h.location.set_fix(123.0, 34.0);

    assert!(matches!(
        h.client.positions.acquire().await,
        Err(PositionError::PositionUnavailable(_))
    ));
}

#[tokio::test]
async fn test_every_acquire_reads_a_fresh_fix() {
    let h = Harness::new();

    let first = h.client.positions.acquire().await.unwrap();
    assert_eq!((first.lat, first.lng), (12.0, 34.0));
    assert_eq!(first.captured_at, helpers::t0());

    h.location.set_fix(13.0, 35.0);
    h.clock.advance(chrono::Duration::minutes(1));
    let second = h.client.positions.acquire().await.unwrap();

    assert_eq!((second.lat, second.lng), (13.0, 35.0));
    assert_eq!(second.captured_at, helpers::t0() + chrono::Duration::minutes(1));
    assert_eq!(h.location.reads(), 2);
}
