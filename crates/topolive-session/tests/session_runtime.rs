//! End-to-end tests of the session runtime against mock collaborators.
//!
//! All tests run on a paused tokio clock: sleeping in the test advances time
//! deterministically and fires the runtime's timers in order.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use topolive_client::mock::{MockApi, MockTransport, RecordingNavigator};
use topolive_core::machine::{DEFAULT_HISTORY_QUERY, MSG_AUTH_FAILED, MSG_DISCONNECTED};
use topolive_core::operations::OperationState;
use topolive_core::routes::Route;
use topolive_core::{ApiError, TransportError, TransportEvent};
use topolive_session::{ClientEvent, RuntimeConfig, SessionError, SessionHandle, SessionRuntime};

struct Harness {
    handle: SessionHandle,
    api: Arc<MockApi>,
    transport: Arc<MockTransport>,
    navigator: Arc<RecordingNavigator>,
    events: mpsc::UnboundedSender<TransportEvent>,
    task: JoinHandle<()>,
}

fn harness() -> Harness {
    let api = Arc::new(MockApi::new("analyzer", "0.27.0"));
    let transport = Arc::new(MockTransport::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let (events, events_rx) = mpsc::unbounded_channel();
    let (handle, task) = SessionRuntime::spawn(
        RuntimeConfig::default(),
        api.clone(),
        transport.clone(),
        navigator.clone(),
        events_rx,
    );
    Harness {
        handle,
        api,
        transport,
        navigator,
        events,
        task,
    }
}

/// Let the runtime and the tasks it spawned drain their queues.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

impl Harness {
    async fn login(&self) {
        self.handle.login().unwrap();
        settle().await;
    }

    async fn transport_event(&self, event: TransportEvent) {
        self.events.send(event).unwrap();
        settle().await;
    }
}

#[tokio::test(start_paused = true)]
async fn login_connects_navigates_and_probes() {
    let h = harness();
    h.login().await;

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.authenticated, Some(true));
    assert!(snapshot.polling_active);
    assert_eq!(snapshot.service_name.as_deref(), Some("Analyzer"));
    assert_eq!(snapshot.service_version.as_deref(), Some("0.27.0"));
    assert_eq!(snapshot.history_capable, Some(true));

    assert_eq!(h.transport.connects(), 1);
    assert_eq!(h.navigator.routes(), vec![Route::Topology]);
    assert_eq!(h.api.service_calls(), 1);
    assert_eq!(h.api.queries(), vec![DEFAULT_HISTORY_QUERY.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn history_probe_failure_marks_unsupported() {
    let h = harness();
    h.api
        .set_topology_result(Err(ApiError::from_status(500, "no history".into())));
    h.login().await;

    assert_eq!(h.handle.snapshot().history_capable, Some(false));
    assert_eq!(h.handle.snapshot().authenticated, Some(true));
}

#[tokio::test(start_paused = true)]
async fn start_logs_in_through_successful_probe() {
    let h = harness();
    h.handle.start().unwrap();
    settle().await;

    assert_eq!(h.handle.snapshot().authenticated, Some(true));
    assert_eq!(h.navigator.routes(), vec![Route::Topology]);
    assert_eq!(h.transport.connects(), 1);
    // Boot probe plus the one issued by the login transition.
    assert_eq!(h.api.service_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn reconnects_once_after_fixed_delay() {
    let h = harness();
    h.login().await;
    h.transport_event(TransportEvent::Connected).await;
    h.transport_event(TransportEvent::Disconnected).await;
    h.transport_event(TransportEvent::Disconnected).await;
    assert!(h.handle.snapshot().reconnect_pending);

    sleep_ms(999).await;
    assert_eq!(h.transport.connects(), 1);

    sleep_ms(2).await;
    assert_eq!(h.transport.connects(), 2);
    assert!(!h.handle.snapshot().reconnect_pending);

    sleep_ms(3_000).await;
    assert_eq!(h.transport.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn logout_before_reconnect_cancels_it() {
    let h = harness();
    h.login().await;
    h.transport_event(TransportEvent::Error("reset".into())).await;
    h.handle.logout().unwrap();
    settle().await;

    sleep_ms(2_000).await;
    assert_eq!(h.transport.connects(), 1);
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test(start_paused = true)]
async fn polling_runs_while_logged_in_and_stops_on_logout() {
    let h = harness();
    h.login().await;
    assert_eq!(h.api.service_calls(), 1);

    sleep_ms(5_001).await;
    assert_eq!(h.api.service_calls(), 2);
    sleep_ms(5_000).await;
    assert_eq!(h.api.service_calls(), 3);

    h.handle.logout().unwrap();
    settle().await;
    assert!(!h.handle.snapshot().polling_active);

    sleep_ms(20_000).await;
    assert_eq!(h.api.service_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn stale_probe_result_is_ignored() {
    let h = harness();
    h.api.set_delay(Duration::from_millis(100));
    h.handle.start().unwrap();
    settle().await;
    // Logging out bumps the epoch while the boot probe is still in flight.
    h.handle.logout().unwrap();
    settle().await;

    sleep_ms(200).await;
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.authenticated, Some(false));
    assert_eq!(snapshot.service_name, None);
    assert_eq!(h.navigator.routes(), vec![Route::Login]);
    assert_eq!(h.transport.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_poll_forces_logout() {
    let h = harness();
    h.login().await;
    h.api.set_service_result(Err(ApiError::Unauthorized));

    sleep_ms(5_001).await;
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.authenticated, Some(false));
    assert!(!snapshot.polling_active);
    assert_eq!(h.navigator.last(), Some(Route::Login));

    let messages: Vec<String> = h
        .handle
        .notifications()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.message)
        .collect();
    assert_eq!(messages, vec![MSG_AUTH_FAILED.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn reported_unauthorized_is_idempotent() {
    let h = harness();
    h.login().await;
    h.handle.report_unauthorized().unwrap();
    h.handle.report_unauthorized().unwrap();
    settle().await;

    assert_eq!(h.handle.snapshot().authenticated, Some(false));
    assert_eq!(h.navigator.routes(), vec![Route::Topology, Route::Login]);
    assert_eq!(h.handle.notifications().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn notifications_dedup_dismiss_and_expire() {
    let h = harness();
    let mut events = h.handle.subscribe();
    h.transport_event(TransportEvent::Disconnected).await;
    h.transport_event(TransportEvent::Disconnected).await;

    let queued = h.handle.notifications().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].message, MSG_DISCONNECTED);
    assert_matches!(
        events.try_recv(),
        Ok(ClientEvent::Notified { message, .. }) if message == MSG_DISCONNECTED
    );
    assert!(events.try_recv().is_err());

    assert!(h.handle.dismiss(queued[0].id).await.unwrap());
    assert!(!h.handle.dismiss(queued[0].id).await.unwrap());

    h.transport_event(TransportEvent::Connected).await;
    assert_eq!(h.handle.notifications().await.unwrap().len(), 1);
    sleep_ms(11_000).await;
    assert!(h.handle.notifications().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn metric_frames_feed_widgets() {
    let h = harness();
    let mut events = h.handle.subscribe();
    let frame = |metric: serde_json::Value| {
        TransportEvent::Message(json!({
            "Namespace": "Metrics",
            "Type": "MetricUpdate",
            "Obj": {"Widget": "eth0", "Metric": metric}
        }))
    };

    h.transport_event(frame(json!({"Start": "t0", "RxBytes": 0, "TxBytes": 5, "Drops": 3})))
        .await;
    assert_eq!(events.try_recv().unwrap(), ClientEvent::WidgetUpdated("eth0".into()));

    let view = h.handle.widget("eth0").await.unwrap().unwrap();
    assert_eq!(view.visible, vec!["Start", "TxBytes", "Drops"]);

    assert!(h.handle.toggle_field("eth0", "Drops").await.unwrap());
    h.transport_event(frame(json!({"Start": "t1", "RxBytes": 4, "TxBytes": 6, "Drops": 9})))
        .await;
    let view = h.handle.widget("eth0").await.unwrap().unwrap();
    assert_eq!(view.visible, vec!["Start", "RxBytes", "TxBytes"]);
    assert_eq!(view.row["Drops"], json!(9));

    assert!(h.handle.widget("eth1").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn highlight_request_completes_on_matching_reply() {
    let h = harness();
    let mut events = h.handle.subscribe();
    let id = h.handle.request_highlight("G.V().Has('Name', 'eth0')").await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["Type"], "Highlight");
    assert_eq!(sent[0]["UUID"], id.as_str());
    assert_eq!(
        h.handle.highlight_status(id.clone()).await.unwrap(),
        OperationState::Pending
    );
    assert_eq!(h.handle.view().await.unwrap().highlights_in_progress, 1);

    h.transport_event(TransportEvent::Message(json!({
        "Namespace": "Graph",
        "Type": "HighlightReply",
        "UUID": id.as_str(),
        "Status": 200,
        "Obj": null
    })))
    .await;
    assert_eq!(events.try_recv().unwrap(), ClientEvent::HighlightCompleted(id.clone()));
    assert_eq!(
        h.handle.highlight_status(id.clone()).await.unwrap(),
        OperationState::Completed
    );

    h.handle.discard_highlight(id.clone()).await.unwrap();
    assert_eq!(
        h.handle.highlight_status(id).await.unwrap(),
        OperationState::Unknown
    );
}

#[tokio::test(start_paused = true)]
async fn failed_highlight_send_leaves_nothing_tracked() {
    let h = harness();
    h.transport.set_accepting(false);
    let err = h.handle.request_highlight("G.V()").await.unwrap_err();
    assert_eq!(err, SessionError::Transport(TransportError::NotConnected));
    assert_eq!(h.handle.view().await.unwrap().highlights_in_progress, 0);
}

#[tokio::test(start_paused = true)]
async fn unclaimed_frames_are_broadcast() {
    let h = harness();
    let mut events = h.handle.subscribe();
    h.transport_event(TransportEvent::Message(json!({
        "Namespace": "Graph",
        "Type": "NodeAdded",
        "Obj": {"ID": "n1"}
    })))
    .await;
    h.transport_event(TransportEvent::Message(json!("not an envelope"))).await;

    assert_matches!(events.try_recv(), Ok(ClientEvent::Frame(frame)) if frame.kind == "NodeAdded");
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn view_transitions_round_trip() {
    let h = harness();
    let view = h
        .handle
        .update_view(|v| {
            v.select_node("n1");
            let _ = v.highlight("n2");
            v.set_topology_filter("G.V().Has('Type', 'host')");
        })
        .await
        .unwrap();
    assert_eq!(view.current_node.as_deref(), Some("n1"));
    assert_eq!(view.highlighted_nodes, vec!["n2"]);
    assert_eq!(h.handle.view().await.unwrap(), view);
}

#[tokio::test(start_paused = true)]
async fn handle_fails_once_runtime_is_gone() {
    let h = harness();
    h.task.abort();
    let _ = h.task.await;

    assert_eq!(h.handle.login(), Err(SessionError::RuntimeClosed));
    assert_eq!(h.handle.view().await, Err(SessionError::RuntimeClosed));
}
