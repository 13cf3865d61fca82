//! End-to-end tests: a real listener driven with reqwest, Slack mocked with
//! wiremock.

use diary::{AckWorkflow, CauseMenu, DispatchPath, IncidentDispatcher, MemoryStore};
use diary_notify::SlackGateway;
use diary_server::{build_router, AlertResponse, AppState};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Channel named by the alerts
const ALERT_CHANNEL: &str = "#ops";
/// Id Slack reports for it
const CHANNEL: &str = "C0123";
const ROOT_TS: &str = "1700000000.000100";

/// Start the diary on a random port, talking to the mock Slack API.
async fn start_diary(slack: &MockServer) -> SocketAddr {
    let store = Arc::new(MemoryStore::new());
    let gateway =
        Arc::new(SlackGateway::new("xoxb-test").with_base_url(format!("{}/api", slack.uri())));
    let state = Arc::new(AppState {
        dispatcher: IncidentDispatcher::new(store.clone(), gateway.clone()),
        ack: AckWorkflow::new(store, gateway, CauseMenu::default()),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

async fn mock_post_message(slack: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": CHANNEL,
            "ts": ROOT_TS
        })))
        .mount(slack)
        .await;
}

fn alert(state: &str) -> serde_json::Value {
    json!({
        "incident_id": 42,
        "channel": ALERT_CHANNEL,
        "generated_by": "New Relic",
        "name": "CPU high",
        "url": "https://alerts.example/42",
        "description": "CPU above 90% on web-1",
        "state": state,
        "severity": "critical",
        "condition_id": 7
    })
}

async fn send_alert(client: &reqwest::Client, addr: SocketAddr, state: &str) -> AlertResponse {
    let response = client
        .post(format!("http://{addr}/api/alerts"))
        .json(&alert(state))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

async fn send_interaction(
    client: &reqwest::Client,
    addr: SocketAddr,
    payload: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("http://{addr}/api/slack/interactions"))
        .form(&[("payload", payload.to_string())])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let slack = MockServer::start().await;
    let addr = start_diary(&slack).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_alert_lifecycle() {
    let slack = MockServer::start().await;
    mock_post_message(&slack).await;
    Mock::given(method("POST"))
        .and(path("/api/chat.update"))
        .and(body_partial_json(json!({"channel": CHANNEL, "ts": ROOT_TS})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": CHANNEL,
            "ts": ROOT_TS
        })))
        .expect(1)
        .mount(&slack)
        .await;

    let addr = start_diary(&slack).await;
    let client = reqwest::Client::new();

    let opened = send_alert(&client, addr, "open").await;
    assert_eq!(opened.status, "ok");
    assert_eq!(opened.path, DispatchPath::Announced);
    assert_eq!(opened.root_message_ts.as_deref(), Some(ROOT_TS));
    assert!(opened.errors.is_empty());

    let closed = send_alert(&client, addr, "closed").await;
    assert_eq!(closed.status, "ok");
    assert_eq!(closed.path, DispatchPath::Updated);
    assert_eq!(closed.root_message_ts.as_deref(), Some(ROOT_TS));
}

#[tokio::test]
async fn test_slack_failure_is_partial() {
    let slack = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
        )
        .mount(&slack)
        .await;

    let addr = start_diary(&slack).await;
    let response = send_alert(&reqwest::Client::new(), addr, "open").await;

    assert_eq!(response.status, "partial");
    assert_eq!(response.root_message_ts, None);
    assert!(response
        .errors
        .iter()
        .any(|e| e.starts_with("post_root_message") && e.contains("channel_not_found")));
}

#[tokio::test]
async fn test_ignore_then_form_submission() {
    let slack = MockServer::start().await;
    mock_post_message(&slack).await;
    Mock::given(method("POST"))
        .and(path("/api/chat.update"))
        .and(body_partial_json(json!({
            "channel": CHANNEL,
            "ts": ROOT_TS,
            "replace_original": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": CHANNEL,
            "ts": ROOT_TS
        })))
        .expect(2)
        .mount(&slack)
        .await;

    let addr = start_diary(&slack).await;
    let client = reqwest::Client::new();
    send_alert(&client, addr, "open").await;

    let click = json!({
        "type": "block_actions",
        "user": {"id": "U1", "username": "alice", "name": "alice"},
        "team": {"id": "T1", "domain": "acme"},
        "container": {"message_ts": ROOT_TS, "channel_id": CHANNEL},
        "channel": {"id": CHANNEL, "name": "ops"},
        "trigger_id": "trig-1",
        "actions": [{"action_id": "ignore_btn", "value": "ignored"}]
    });
    let response = send_interaction(&client, addr, &click).await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());

    let submission = json!({
        "type": "view_submission",
        "user": {"id": "U1", "username": "alice"},
        "view": {
            "callback_id": "ack_reason_form",
            "private_metadata": format!("{CHANNEL}:{ROOT_TS}"),
            "state": {"values": {
                "reason_other": {"reason_other": {"type": "plain_text_input", "value": "cosmic rays"}}
            }}
        }
    });
    let response = send_interaction(&client, addr, &submission).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_unparseable_interaction() {
    let slack = MockServer::start().await;
    let addr = start_diary(&slack).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/slack/interactions"))
        .form(&[("payload", "{not json")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
