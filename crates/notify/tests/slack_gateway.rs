//! Slack gateway tests against a mock Web API.

use diary_notify::{
    Block, BlockElement, ChannelError, ChatGateway, MessageContent, ModalView, SlackGateway,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> SlackGateway {
    SlackGateway::new("xoxb-test").with_base_url(format!("{}/api", server.uri()))
}

fn content() -> MessageContent {
    MessageContent::new(
        "[New Relic:critical:] CPU high",
        "https://alerts.example/42",
        "#E01E5A",
        vec![Block::section("*Status :* open")],
    )
}

#[tokio::test]
async fn test_post_root_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({
            "channel": "C0123",
            "text": "[New Relic:critical:] CPU high",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": "C0123",
            "ts": "1700000000.000100"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posted = gateway(&server)
        .post_message("C0123", &content(), None)
        .await
        .unwrap();

    assert_eq!(posted.channel, "C0123");
    assert_eq!(posted.ts, "1700000000.000100");
}

#[tokio::test]
async fn test_threaded_reply_carries_thread_ts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .and(body_partial_json(json!({ "thread_ts": "1700000000.000100" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": "C0123",
            "ts": "1700000050.000200"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posted = gateway(&server)
        .post_message("C0123", &content(), Some("1700000000.000100"))
        .await
        .unwrap();

    assert_eq!(posted.ts, "1700000050.000200");
}

#[tokio::test]
async fn test_update_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.update"))
        .and(body_partial_json(json!({
            "channel": "C0123",
            "ts": "1700000000.000100",
            "replace_original": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": "C0123",
            "ts": "1700000000.000100"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posted = gateway(&server)
        .update_message("C0123", "1700000000.000100", &content().replacing_original())
        .await
        .unwrap();

    assert_eq!(posted.ts, "1700000000.000100");
}

#[tokio::test]
async fn test_open_modal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/views.open"))
        .and(body_partial_json(json!({
            "trigger_id": "trig-1",
            "view": { "type": "modal", "callback_id": "ack_reason_form" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let view = ModalView::new(
        "ack_reason_form",
        "Incident Diary",
        "C0123:1700000000.000100".to_string(),
        vec![Block::Actions {
            elements: vec![BlockElement::button("noop", "Noop", "")],
        }],
    );

    gateway(&server).open_modal("trig-1", &view).await.unwrap();
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "error": "message_not_found"
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .update_message("C0123", "1.1", &content())
        .await
        .unwrap_err();

    match err {
        ChannelError::Api { method, error } => {
            assert_eq!(method, "chat.update");
            assert_eq!(error, "message_not_found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .post_message("C0123", &content(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ChannelError::RateLimited {
            retry_after_secs: 30
        }
    ));
}

#[tokio::test]
async fn test_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .post_message("C0123", &content(), None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("500"));
}
