use std::time::Duration;

use extendo_host::*;
use serde_json::{json, Value};
use tokio::io::{duplex, DuplexStream};
use tokio::time::timeout;

async fn next_host_frame(relay_in: &mut DuplexStream) -> Option<HostFrame> {
    timeout(Duration::from_secs(5), read_message(relay_in))
        .await
        .expect("host frame in time")
        .expect("well-formed host frame")
}

async fn send(relay_out: &mut DuplexStream, frame: &Value) {
    write_message(relay_out, frame).await.expect("relay write");
}

#[tokio::test]
async fn boots_syncs_answers_runtime_messages_and_exits_on_eof() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        store_path: dir.path().join("store.json"),
        peer_timeout: Duration::from_secs(2),
        blackiya_extension_id: Some("peer-extension".into()),
        ..HostConfig::default()
    };

    let (host_in, mut relay_out) = duplex(64 * 1024);
    let (host_out, mut relay_in) = duplex(64 * 1024);
    let host = tokio::spawn(serve(config, host_in, host_out));

    send(
        &mut relay_out,
        &json!({
            "kind": "runtime.message",
            "request_id": "rt-1",
            "message": {"type": "translate-selection"}
        }),
    )
    .await;

    let mut seen_port = None;
    let mut seen_pull = false;
    let mut runtime_response = None;
    while !(seen_pull && runtime_response.is_some()) {
        match next_host_frame(&mut relay_in).await.expect("host still running") {
            HostFrame::PeerRequest {
                request_id,
                peer_id,
                message,
            } => {
                assert_eq!(peer_id, "peer-extension");
                let reply = match message["type"].as_str() {
                    Some("health.ping") => json!({"ok": true}),
                    Some("conversation.getLatest") => {
                        seen_pull = true;
                        json!({
                            "ok": false, "api": "blackiya.events.v1", "ts": 1,
                            "code": "NOT_FOUND", "message": "nothing captured"
                        })
                    }
                    other => panic!("unexpected peer request {other:?}"),
                };
                send(
                    &mut relay_out,
                    &json!({"kind": "peer.response", "request_id": request_id, "ok": true, "reply": reply}),
                )
                .await;
            }
            HostFrame::PortOpen { port_id, name, .. } => {
                assert_eq!(name, "blackiya.events.v1");
                seen_port = Some(port_id);
            }
            HostFrame::RuntimeResponse {
                request_id,
                response,
            } => {
                assert_eq!(request_id, "rt-1");
                runtime_response = Some(response);
            }
        }
    }

    assert!(seen_port.is_some(), "port opened before the pull");
    assert_eq!(runtime_response, Some(Value::Null));

    drop(relay_out);
    let outcome = timeout(Duration::from_secs(5), host)
        .await
        .expect("host exits")
        .expect("host task");
    assert!(outcome.is_ok());

    let persisted: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("store.json")).unwrap()).unwrap();
    assert_eq!(persisted["blackiya_extension_id"], "peer-extension");
}
