// End-to-end controller tests over the scripted device and fake transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use common::{CollectingSink, FakeTransport, ScriptedDevice};
use slu_client::{SessionConfig, SessionController, StreamEvent, StreamRequest};

fn test_session_config() -> SessionConfig {
    SessionConfig {
        app_id: "test-app".to_string(),
        poll_interval: Duration::from_millis(5),
        ..SessionConfig::default()
    }
}

fn event_count(requests: &[StreamRequest], wanted: StreamEvent) -> usize {
    requests
        .iter()
        .filter(|request| matches!(request, StreamRequest::Event { event } if *event == wanted))
        .count()
}

#[tokio::test]
async fn test_toggle_cycle_sends_one_start_and_one_stop() {
    let transport = Arc::new(FakeTransport::new());
    let device = ScriptedDevice::new(vec![]);
    let controller = SessionController::with_parts(
        Box::new(device),
        transport.clone(),
        test_session_config(),
        Arc::new(CollectingSink::default()),
    )
    .await
    .unwrap();

    assert!(!controller.is_recording());
    controller.toggle().await.unwrap();
    assert!(controller.is_recording());

    // Toggling while recording only requests a stop; no second start event.
    controller.toggle().await.unwrap();
    assert!(!controller.is_recording());

    controller.shutdown().await.unwrap();

    let requests = transport.sent_requests();
    assert!(matches!(requests[0], StreamRequest::Config(_)));
    assert_eq!(event_count(&requests, StreamEvent::Start), 1);
    assert_eq!(event_count(&requests, StreamEvent::Stop), 1);
}

#[tokio::test]
async fn test_start_is_idempotent_at_the_controller() {
    let transport = Arc::new(FakeTransport::new());
    let device = ScriptedDevice::new(vec![]);
    let controller = SessionController::with_parts(
        Box::new(device),
        transport.clone(),
        test_session_config(),
        Arc::new(CollectingSink::default()),
    )
    .await
    .unwrap();

    controller.start().await.unwrap();
    controller.start().await.unwrap();
    controller.stop();
    controller.shutdown().await.unwrap();

    let requests = transport.sent_requests();
    assert_eq!(event_count(&requests, StreamEvent::Start), 1);
    assert_eq!(event_count(&requests, StreamEvent::Stop), 1);
}

#[tokio::test]
async fn test_full_outbound_scenario() {
    // Three poll cycles yielding 0, 320, and 480 samples should produce
    // config, start, a 640 byte frame, a 960 byte frame, then stop.
    let transport = Arc::new(FakeTransport::new());
    let device = ScriptedDevice::new(vec![vec![], vec![1i16; 320], vec![2i16; 480]]);
    let controller = SessionController::with_parts(
        Box::new(device),
        transport.clone(),
        test_session_config(),
        Arc::new(CollectingSink::default()),
    )
    .await
    .unwrap();

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    controller.stop();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let stats = controller.stats();
    assert!(!stats.is_recording);
    assert_eq!(stats.frames_sent, 2);
    assert_eq!(stats.segments_completed, 1);

    controller.shutdown().await.unwrap();

    let requests = transport.sent_requests();
    assert_eq!(requests.len(), 5);
    assert!(matches!(requests[0], StreamRequest::Config(_)));
    assert_eq!(
        requests[1],
        StreamRequest::Event {
            event: StreamEvent::Start
        }
    );
    match (&requests[2], &requests[3]) {
        (StreamRequest::Audio { data: first }, StreamRequest::Audio { data: second }) => {
            let first = base64::engine::general_purpose::STANDARD
                .decode(first)
                .unwrap();
            let second = base64::engine::general_purpose::STANDARD
                .decode(second)
                .unwrap();
            assert_eq!(first.len(), 640);
            assert_eq!(second.len(), 960);
        }
        other => panic!("expected two audio frames, got {:?}", other),
    }
    assert_eq!(
        requests[4],
        StreamRequest::Event {
            event: StreamEvent::Stop
        }
    );
}

#[tokio::test]
async fn test_responses_reach_the_sink() {
    let transport = Arc::new(FakeTransport::with_inbound(vec![
        serde_json::json!({"transcript": "one"}),
        serde_json::json!({"transcript": "two"}),
    ]));
    let device = ScriptedDevice::new(vec![]);
    let sink = Arc::new(CollectingSink::default());
    let controller = SessionController::with_parts(
        Box::new(device),
        transport,
        test_session_config(),
        sink.clone(),
    )
    .await
    .unwrap();

    // The response loop drains the scripted inbound queue on its own.
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.shutdown().await.unwrap();

    assert_eq!(sink.messages.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_shutdown_closes_device_and_transport() {
    let transport = Arc::new(FakeTransport::new());
    let device = ScriptedDevice::new(vec![]);
    let probe = device.probe();
    let controller = SessionController::with_parts(
        Box::new(device),
        transport.clone(),
        test_session_config(),
        Arc::new(CollectingSink::default()),
    )
    .await
    .unwrap();

    controller.start().await.unwrap();
    controller.shutdown().await.unwrap();

    assert!(probe.closed.load(std::sync::atomic::Ordering::SeqCst));
    assert!(transport.closed.load(std::sync::atomic::Ordering::SeqCst));
}
