//! End-to-end tests against a loopback fake gateway over a real WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nls_transcriber::{
    EventKind, SessionState, StartOptions, Transcriber, TranscriberConfig, TranscriberError,
    TranscriptionEvent,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the fake gateway observed from its single client.
#[derive(Debug)]
enum Seen {
    Request(Value),
    Audio(usize),
}

/// How the fake gateway answers `StopTranscription`.
#[derive(Clone, Copy)]
enum Finish {
    Complete,
    Fail,
    Hangup,
}

fn reply(name: &str, task_id: &str, status: u32, payload: Value) -> Message {
    json!({
        "header": {
            "namespace": "SpeechTranscriber",
            "name": name,
            "status": status,
            "message_id": "0123456789abcdef0123456789abcdef",
            "task_id": task_id,
            "status_text": "Gateway:SUCCESS:Success.",
        },
        "payload": payload,
    })
    .to_string()
    .into()
}

/// Serve one session: acknowledge start, emit one sentence after the first
/// audio frame, and answer stop according to `finish`.
async fn fake_gateway(finish: Finish) -> (String, mpsc::UnboundedReceiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws/v1", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let mut task_id = String::new();
        let mut audio_frames = 0;

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let name = request["header"]["name"].as_str().unwrap_or_default().to_string();
                    task_id = request["header"]["task_id"].as_str().unwrap_or_default().to_string();
                    let _ = seen_tx.send(Seen::Request(request));

                    match (name.as_str(), finish) {
                        ("StartTranscription", _) => {
                            let started = reply("TranscriptionStarted", &task_id, 20000000, json!({}));
                            ws.send(started).await.unwrap();
                        }
                        ("StopTranscription", Finish::Complete) => {
                            let done = reply("TranscriptionCompleted", &task_id, 20000000, json!({}));
                            ws.send(done).await.unwrap();
                        }
                        ("StopTranscription", Finish::Fail) => {
                            let failed = reply("TaskFailed", &task_id, 40000001, json!({}));
                            ws.send(failed).await.unwrap();
                        }
                        ("StopTranscription", Finish::Hangup) => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        _ => {}
                    }
                }
                Message::Binary(data) => {
                    audio_frames += 1;
                    let _ = seen_tx.send(Seen::Audio(data.len()));
                    if audio_frames == 1 {
                        let begin = reply("SentenceBegin", &task_id, 20000000, json!({"index": 1, "time": 0}));
                        let end = reply(
                            "SentenceEnd",
                            &task_id,
                            20000000,
                            json!({"index": 1, "time": 900, "result": "hello world", "begin_time": 0}),
                        );
                        ws.send(begin).await.unwrap();
                        ws.send(end).await.unwrap();
                    }
                }
                _ => {}
            }
        }
    });

    (url, seen_rx)
}

fn transcriber(url: &str) -> Transcriber {
    let config = TranscriberConfig::new("e2e-app-key", "e2e-token").with_url(url);
    Transcriber::new(config).unwrap()
}

async fn next_kind(rx: &mut tokio::sync::broadcast::Receiver<TranscriptionEvent>) -> EventKind {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .unwrap()
        .kind()
}

#[tokio::test]
async fn full_session_round_trip() {
    let (url, mut seen) = fake_gateway(Finish::Complete).await;
    let t = transcriber(&url);
    let mut events = t.subscribe();

    let started = timeout(Duration::from_secs(5), t.start(StartOptions::default()))
        .await
        .unwrap()
        .unwrap();
    assert!(started.is_success());
    assert_eq!(next_kind(&mut events).await, EventKind::Started);

    assert!(t.send_audio(vec![0u8; 2048]));
    assert!(t.send_audio(vec![0u8; 1024]));
    assert_eq!(next_kind(&mut events).await, EventKind::Begin);
    match timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
        TranscriptionEvent::End(response) => {
            let payload: nls_protocol::SentenceEndPayload = response.payload_as().unwrap();
            assert_eq!(payload.result, "hello world");
        }
        other => panic!("expected sentence end, got {other:?}"),
    }

    let completed = timeout(Duration::from_secs(5), t.close(json!({})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.header.name, "TranscriptionCompleted");
    assert_eq!(next_kind(&mut events).await, EventKind::Completed);
    assert_eq!(t.state(), SessionState::Closed);

    // Start, two audio frames, stop, in that order, all for one task
    let mut observed = Vec::new();
    while let Ok(item) = seen.try_recv() {
        observed.push(item);
    }
    assert_eq!(observed.len(), 4);
    let Seen::Request(start) = &observed[0] else { panic!("expected start first") };
    assert!(matches!(observed[1], Seen::Audio(2048)));
    assert!(matches!(observed[2], Seen::Audio(1024)));
    let Seen::Request(stop) = &observed[3] else { panic!("expected stop last") };
    assert_eq!(start["header"]["name"], "StartTranscription");
    assert_eq!(start["header"]["appkey"], "e2e-app-key");
    assert_eq!(start["context"]["sdk"]["language"], "rust");
    assert_eq!(stop["header"]["name"], "StopTranscription");
    assert_eq!(start["header"]["task_id"], stop["header"]["task_id"]);
}

#[tokio::test]
async fn gateway_failure_rejects_close() {
    let (url, _seen) = fake_gateway(Finish::Fail).await;
    let t = transcriber(&url);

    t.start(StartOptions::default().without_liveness()).await.unwrap();
    let err = timeout(Duration::from_secs(5), t.close(json!({})))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.response().unwrap().header.status, 40000001);
    assert_eq!(t.state(), SessionState::Failed);
    assert!(!t.is_connected());
}

#[tokio::test]
async fn gateway_hangup_emits_closed() {
    let (url, _seen) = fake_gateway(Finish::Hangup).await;
    let t = transcriber(&url);
    let mut events = t.subscribe();

    t.start(StartOptions::default()).await.unwrap();
    assert_eq!(next_kind(&mut events).await, EventKind::Started);

    let result = timeout(Duration::from_secs(5), t.close(json!({}))).await.unwrap();
    assert!(matches!(result, Err(TranscriberError::Disconnected)));
    assert_eq!(next_kind(&mut events).await, EventKind::Closed);
    assert_eq!(t.state(), SessionState::Closed);
}

#[tokio::test]
async fn unreachable_gateway_fails_start() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws/v1", listener.local_addr().unwrap());
    drop(listener);

    let t = transcriber(&url);
    let result = t.start(StartOptions::default()).await;
    assert!(matches!(result, Err(TranscriberError::Transport(_))));
    assert_eq!(t.state(), SessionState::Failed);
}
