mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{app_state, Fakes};
use readyboard_core::api::{StartOutcome, StopOutcome};
use readyboard_core::model::Overall;
use readyboard_core::now_ms;
use readyboard_daemon::ports::{EndpointError, EndpointLifecycle};

const MINUTE_MS: i64 = 60_000;

#[tokio::test]
async fn status_publishes_into_the_store() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    assert_eq!(state.store.current().provisioning.overall, Overall::Loading);

    let status = state.provisioning.status().await;
    assert_eq!(status.overall, Overall::Ready);
    assert_eq!(status.services.len(), 5);
    assert_eq!(state.store.current().provisioning, status);
    assert!(!state.store.current().health.is_degraded());
}

#[tokio::test]
async fn start_creates_absent_endpoint_once() {
    let fakes = Fakes::new();
    let state = app_state(&fakes, None);

    let first = state.provisioning.start().await;
    assert_eq!(first.action, StartOutcome::Starting);
    assert!(first.started_at_ms.is_some());
    assert_eq!(fakes.endpoints.creates(), 1);

    let second = state.provisioning.start().await;
    assert_eq!(second.action, StartOutcome::AlreadyStarting);
    assert_eq!(second.started_at_ms, first.started_at_ms);
    assert_eq!(fakes.endpoints.creates(), 1);

    fakes.endpoints.set(Some(EndpointLifecycle::InService));
    let third = state.provisioning.start().await;
    assert_eq!(third.action, StartOutcome::AlreadyRunning);
    assert_eq!(third.overall, Overall::Ready);
    assert_eq!(fakes.endpoints.creates(), 1);
}

#[tokio::test]
async fn start_reports_existing_endpoint_status() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::Failed));
    let state = app_state(&fakes, None);
    let resp = state.provisioning.start().await;
    assert_eq!(
        resp.action,
        StartOutcome::Exists {
            status: "Failed".into()
        }
    );
    assert_eq!(fakes.endpoints.creates(), 0);
}

#[tokio::test]
async fn failed_start_records_no_session() {
    let fakes = Fakes::new();
    *fakes.endpoints.describe_error.lock().unwrap() =
        Some(EndpointError::AccessDenied("denied".into()));
    let state = app_state(&fakes, None);

    let resp = state.provisioning.start().await;
    assert!(matches!(resp.action, StartOutcome::Failed { .. }));
    assert_eq!(resp.started_at_ms, None);
    assert_eq!(state.provisioning.started_at_ms(), None);
}

#[tokio::test]
async fn stop_is_idempotent_and_never_deletes_twice() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    state.provisioning.start().await;

    let first = state.provisioning.stop().await;
    assert!(first.acknowledged);
    assert_eq!(first.action, StopOutcome::Stopping);
    assert_eq!(fakes.endpoints.deletes(), 1);

    let second = state.provisioning.stop().await;
    assert!(second.acknowledged);
    assert_eq!(second.action, StopOutcome::NotFound);
    assert_eq!(fakes.endpoints.deletes(), 1);

    let snap = state.store.current();
    assert_eq!(snap.provisioning.overall, Overall::Down);
    assert_eq!(snap.provisioning.started_at_ms, None);
    assert_eq!(state.provisioning.started_at_ms(), None);
}

#[tokio::test]
async fn stop_while_deleting_issues_no_delete() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::Deleting));
    let state = app_state(&fakes, None);
    let resp = state.provisioning.stop().await;
    assert_eq!(resp.action, StopOutcome::AlreadyStopping);
    assert!(resp.acknowledged);
    assert_eq!(fakes.endpoints.deletes(), 0);
}

#[tokio::test]
async fn failed_stop_still_resets_local_state() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    state.provisioning.start().await;
    *fakes.endpoints.describe_error.lock().unwrap() = Some(EndpointError::Other("500".into()));

    let resp = state.provisioning.stop().await;
    assert!(!resp.acknowledged);
    assert_eq!(state.store.current().provisioning.overall, Overall::Down);
    assert_eq!(state.provisioning.started_at_ms(), None);
}

#[tokio::test]
async fn session_cap_stops_exactly_once() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    let started = state.provisioning.start().await.started_at_ms.unwrap();

    let early = state.provisioning.check_session_at(started + 30 * MINUTE_MS).await;
    assert!(!early.expired);
    assert_eq!(fakes.endpoints.deletes(), 0);

    let late = state.provisioning.check_session_at(started + 60 * MINUTE_MS).await;
    assert!(late.expired);
    assert_eq!(late.elapsed_minutes, 60);
    assert_eq!(fakes.endpoints.deletes(), 1);

    let describes = fakes.endpoints.describes.load(Ordering::SeqCst);
    for k in 61..65 {
        let again = state.provisioning.check_session_at(started + k * MINUTE_MS).await;
        assert!(!again.expired);
    }
    assert_eq!(fakes.endpoints.deletes(), 1);
    assert_eq!(fakes.endpoints.describes.load(Ordering::SeqCst), describes);
}

#[tokio::test]
async fn idle_session_never_expires() {
    let fakes = Fakes::new();
    let state = app_state(&fakes, None);
    let check = state
        .provisioning
        .check_session_at(now_ms() + 600 * MINUTE_MS)
        .await;
    assert!(!check.expired);
    assert_eq!(fakes.endpoints.deletes(), 0);
}

#[tokio::test]
async fn teardown_stop_is_dispatched_only_for_active_sessions() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    assert!(state.provisioning.dispatch_teardown_stop().is_none());

    state.provisioning.start().await;
    let handle = state.provisioning.dispatch_teardown_stop().unwrap();
    handle.await.unwrap();
    assert_eq!(fakes.endpoints.deletes(), 1);
    assert!(state.provisioning.dispatch_teardown_stop().is_none());
}

#[test]
fn teardown_delete_lands_before_the_runtime_is_dropped() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    fakes.endpoints.delay_deletes(Duration::from_millis(50));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let delivered = runtime.block_on(async {
        let state = app_state(&fakes, None);
        state.provisioning.start().await;
        state.provisioning.teardown(Duration::from_millis(500)).await
    });
    drop(runtime);

    assert!(delivered);
    assert_eq!(fakes.endpoints.deletes(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_waits_no_longer_than_the_grace_period() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    state.provisioning.start().await;
    fakes.endpoints.delay_deletes(Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    assert!(!state.provisioning.teardown(Duration::from_millis(500)).await);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fakes.endpoints.deletes(), 0);
}

#[tokio::test]
async fn teardown_without_a_session_sends_nothing() {
    let fakes = Fakes::with_endpoint(Some(EndpointLifecycle::InService));
    let state = app_state(&fakes, None);
    assert!(!state.provisioning.teardown(Duration::from_millis(500)).await);
    assert_eq!(fakes.endpoints.deletes(), 0);
}
