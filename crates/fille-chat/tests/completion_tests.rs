mod support;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use fille_chat::{ChatCompletionsClient, CompletionClient, UpstreamError};

fn client(url: &str, timeout: Duration) -> ChatCompletionsClient {
    ChatCompletionsClient::new(url, "llama3-70b-8192", "test-key", timeout, Duration::from_secs(1)).expect("client")
}

#[tokio::test]
async fn success_extracts_first_choice() {
    let seen: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::default();
    let recorder = Arc::clone(&seen);
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorder = Arc::clone(&recorder);
            async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
                recorder.lock().unwrap().push((auth, body));
                Json(json!({
                    "id": "cmpl-1",
                    "choices": [
                        { "index": 0, "message": { "role": "assistant", "content": "Yes, it can be normal..." } },
                        { "index": 1, "message": { "role": "assistant", "content": "second" } }
                    ]
                }))
            }
        }),
    );
    let url = support::serve(router).await;

    let reply = client(&url, Duration::from_secs(5)).complete("the prompt").await.expect("reply");
    assert_eq!(reply, "Yes, it can be normal...");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.as_deref(), Some("Bearer test-key"));
    assert_eq!(seen[0].1, json!({
        "model": "llama3-70b-8192",
        "messages": [{ "role": "user", "content": "the prompt" }]
    }));
}

#[tokio::test]
async fn server_error_is_a_status_failure_without_body() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "internal stack trace here") }),
    );
    let url = support::serve(router).await;

    let err = client(&url, Duration::from_secs(5)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Status { status: 500 }));
    assert!(!err.to_string().contains("stack trace"));
}

#[tokio::test]
async fn missing_content_is_malformed() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    );
    let url = support::serve(router).await;
    let err = client(&url, Duration::from_secs(5)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn non_json_success_is_malformed() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async { "<html>gateway</html>" }),
    );
    let url = support::serve(router).await;
    let err = client(&url, Duration::from_secs(5)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn slow_upstream_times_out_within_bound() {
    let router = Router::new().route(
        "/openai/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(json!({ "choices": [{ "message": { "content": "late" } }] }))
        }),
    );
    let url = support::serve(router).await;

    let started = Instant::now();
    let err = client(&url, Duration::from_millis(300)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Timeout), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
}

#[tokio::test]
async fn connection_refused_is_transport() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/openai/v1/chat/completions");
    let err = client(&url, Duration::from_secs(2)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Transport(_) | UpstreamError::Timeout), "{err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn error_status_is_reported_without_waiting_for_body() {
    // Sends a 503 head promising a body that never arrives.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let head = "HTTP/1.1 503 Service Unavailable\r\ncontent-type: text/plain\r\ncontent-length: 1000\r\n\r\npartial";
        socket.write_all(head.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let url = format!("http://{addr}/openai/v1/chat/completions");
    let err = client(&url, Duration::from_millis(500)).complete("p").await.err().expect("error");
    assert!(matches!(err, UpstreamError::Status { status: 503 }), "{err:?}");
}
