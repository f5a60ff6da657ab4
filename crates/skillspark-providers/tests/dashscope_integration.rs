//! Integration tests for the DashScope client.
//!
//! Every test runs against a local wiremock server (or, for a body cut off
//! mid-stream, a bare TCP listener) standing in for DashScope; no API key or
//! network access is needed.

use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use skillspark_providers::{
    ChatMessage, ChatParams, DashScopeClient, GenerationClient, ImageParams, ProviderConfig,
    ProviderError, TextParams,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEXT_PATH: &str = "/api/v1/services/aigc/text-generation/generation";
const IMAGE_PATH: &str = "/api/v1/services/aigc/image-generation/generation";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn client_for(server: &MockServer) -> DashScopeClient {
    let config =
        ProviderConfig::dashscope("sk-test").with_base_url(format!("{}/api/v1", server.uri()));
    DashScopeClient::new(config).unwrap()
}

fn chat_params() -> ChatParams {
    ChatParams {
        messages: vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("Hello!"),
        ],
        model: "qwen-plus".to_string(),
        temperature: 0.7,
        max_tokens: Some(256),
    }
}

fn sse_delta(text: &str) -> String {
    format!(
        "id:1\nevent:result\n:HTTP_STATUS/200\ndata:{}\n\n",
        json!({"output": {"choices": [{"delta": {"content": text}}]}})
    )
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn collect(client: &DashScopeClient) -> Vec<Result<String, ProviderError>> {
    let stream = client.chat_stream(chat_params()).await.unwrap();
    stream.collect().await
}

// ---------------------------------------------------------------------------
// Streaming chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_stream_yields_fragments_in_order() {
    let server = MockServer::start().await;
    let body = [
        sse_delta("Py"),
        ": ping\n\n".to_string(),
        sse_delta("thon"),
        "data: {garbage\n\n".to_string(),
        sse_delta(" is"),
        "data: [DONE]\n\n".to_string(),
    ]
    .concat();

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-dashscope-sse", "enable"))
        .respond_with(sse_response(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments: Vec<String> = collect(&client)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(fragments, vec!["Py", "thon", " is"]);
}

#[tokio::test]
async fn test_chat_stream_forwards_messages_and_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(sse_response("data: [DONE]\n\n".to_string()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(collect(&client).await.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["model"], "qwen-plus");
    assert_eq!(
        body["input"]["messages"],
        json!([
            {"role": "system", "content": "You are helpful."},
            {"role": "user", "content": "Hello!"}
        ])
    );
    assert_eq!(body["parameters"]["max_tokens"], 256);
    assert_eq!(body["parameters"]["incremental_output"], true);
}

#[tokio::test]
async fn test_chat_stream_full_message_variant() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: [DONE]\n\n",
        json!({"output": {"choices": [{"message": {"role": "assistant", "content": "whole reply"}}]}})
    );
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(&client).await;
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].as_deref().unwrap(), "whole reply");
}

#[tokio::test]
async fn test_chat_stream_stops_at_done() {
    let server = MockServer::start().await;
    let body = [sse_delta("kept"), "data: [DONE]\n\n".to_string(), sse_delta("dropped")].concat();
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(&client).await;
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].as_deref().unwrap(), "kept");
}

/// Read one HTTP request off the socket so closing it does not reset the
/// connection under unread bytes.
async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);

        let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if request.len() >= head_end + 4 + body_len {
            return;
        }
    }
}

/// Serves one streaming response that promises more body than it sends,
/// then closes the connection.
async fn truncated_upstream(partial_body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\n\r\n",
            partial_body.len() + 4096
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(partial_body.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
    });

    format!("http://{}/api/v1", addr)
}

#[tokio::test]
async fn test_chat_stream_body_cut_short_is_communication_error() {
    let base_url = truncated_upstream(sse_delta("partial")).await;
    let client =
        DashScopeClient::new(ProviderConfig::dashscope("sk-test").with_base_url(base_url)).unwrap();

    let items: Vec<_> = client
        .chat_stream(chat_params())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2, "items: {items:?}");
    assert_eq!(items[0].as_deref().unwrap(), "partial");
    assert!(matches!(&items[1], Err(ProviderError::Communication(_))));
}

// ---------------------------------------------------------------------------
// Status classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_stream_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "5")
                .set_body_string("Throttling"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = match client.chat_stream(chat_params()).await {
        Err(e) => e,
        Ok(_) => panic!("expected rate limit error before any fragment"),
    };
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_ms: Some(5000)
        }
    ));
}

#[tokio::test]
async fn test_chat_stream_quota_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(402).set_body_string("Arrearage"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.chat_stream(chat_params()).await.err().unwrap();
    assert!(matches!(err, ProviderError::QuotaExhausted { .. }));
}

#[tokio::test]
async fn test_chat_stream_other_status_keeps_status_and_body() {
    let server = MockServer::start().await;
    let upstream_body = r#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string(upstream_body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.chat_stream(chat_params()).await.err().unwrap() {
        ProviderError::Upstream { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, upstream_body);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_key_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ProviderConfig::default().with_base_url(format!("{}/api/v1", server.uri()));
    let client = DashScopeClient::new(config).unwrap();

    let chat = client.chat_stream(chat_params()).await.err().unwrap();
    assert!(chat.is_configuration());

    let text = client
        .generate_text(TextParams::new("write", 100))
        .await
        .unwrap_err();
    assert!(text.is_configuration());

    let image = client
        .generate_image(ImageParams::new("draw", 1024, 1024))
        .await
        .unwrap_err();
    assert!(image.is_configuration());

    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// One-shot generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_generate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("x-dashscope-sse", "disable"))
        .and(body_partial_json(json!({
            "model": "qwen-plus",
            "input": {"messages": [{"role": "user", "content": "Write about owls"}]},
            "parameters": {"max_tokens": 2000}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"choices": [{"message": {"role": "assistant", "content": "Owls are..."}}]},
            "usage": {"total_tokens": 12}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let content = client
        .generate_text(TextParams::new("Write about owls", 2000))
        .await
        .unwrap();
    assert_eq!(content, "Owls are...");
}

#[tokio::test]
async fn test_generate_text_unexpected_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": {"text": "legacy"}})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .generate_text(TextParams::new("x", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_generate_text_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;

    let config = ProviderConfig::dashscope("sk-test")
        .with_base_url(format!("{}/api/v1", server.uri()))
        .with_text_timeout(1);
    let client = DashScopeClient::new(config).unwrap();

    match client.generate_text(TextParams::new("x", 10)).await {
        Err(ProviderError::Communication(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(json!({
            "model": "wanx-v1",
            "input": {"prompt": "an owl teacher"},
            "parameters": {"size": "1024*768", "style": "<sketch>"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"results": [{"url": "https://cdn.example.com/owl.png"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let url = client
        .generate_image(
            ImageParams::new("an owl teacher", 1024, 768).with_style(Some("<sketch>".into())),
        )
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example.com/owl.png");
}

#[tokio::test]
async fn test_generate_image_quota_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(402).set_body_string("no credits"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .generate_image(ImageParams::new("x", 1024, 1024))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::QuotaExhausted { body } if body == "no credits"));
}
