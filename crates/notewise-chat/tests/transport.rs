//! OpenAI-compatible transport against a throwaway local HTTP server.

use std::time::Duration;

use notewise_chat::{
    CallOptions, CompletionSource, GenerationClient, GenerationConfig, StreamChunk,
};
use notewise_core::{CancelToken, CollectingSink};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;

/// Serve exactly one request with the given status line, content type and
/// body. Returns the base URL and a receiver for the raw request body.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (String, oneshot::Receiver<String>) {
    serve_in_parts(status, content_type, vec![body.into_bytes()]).await
}

/// Like [`serve_once`], but the body goes out as separate writes with a
/// pause between them.
async fn serve_in_parts(
    status: &'static str,
    content_type: &'static str,
    parts: Vec<Vec<u8>>,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        // Read headers, then Content-Length bytes of body.
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        let _ = tx.send(request_body);

        let body_len: usize = parts.iter().map(Vec::len).sum();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status, content_type, body_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for part in parts {
            socket.write_all(&part).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        socket.shutdown().await.ok();
    });

    (format!("http://{}/v1", addr), rx)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn config_for(base_url: String) -> GenerationConfig {
    GenerationConfig {
        api_key: Some("test-key-123456".into()),
        base_url,
        default_model: "local-model".into(),
        ..Default::default()
    }
}

fn opts() -> CallOptions {
    CallOptions::default().with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_blocking_call_reads_first_choice() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"  live answer  "}}]}"#;
    let (url, request) = serve_once("200 OK", "application/json", body.to_string()).await;

    let client = GenerationClient::from_config(&config_for(url));
    assert!(client.is_available());

    let out = client.call("Explain osmosis", &opts()).await;
    assert_eq!(out.source, CompletionSource::Live);
    assert_eq!(out.text, "live answer");

    let sent: serde_json::Value = serde_json::from_str(&request.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "local-model");
    assert_eq!(sent["messages"][0]["role"], "user");
    assert_eq!(sent["messages"][0]["content"], "Explain osmosis");
    assert!(sent.get("stream").is_none());
}

#[tokio::test]
async fn test_auth_failure_falls_back_to_mock() {
    let (url, _request) = serve_once(
        "401 Unauthorized",
        "application/json",
        r#"{"error":{"message":"bad key"}}"#.to_string(),
    )
    .await;

    let client = GenerationClient::from_config(&config_for(url));
    let out = client
        .call("Write one multiple choice question", &opts())
        .await;
    assert_eq!(out.source, CompletionSource::Mock);
    assert!(out.text.contains("```json"));
}

#[tokio::test]
async fn test_connection_refused_falls_back_to_mock() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GenerationClient::from_config(&config_for(format!("http://{}/v1", addr)));
    let out = client.call("hello", &opts()).await;
    assert_eq!(out.source, CompletionSource::Mock);
}

#[tokio::test]
async fn test_sse_stream_with_missing_deltas_and_usage() {
    let sse = [
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        r##"data: {"choices":[{"delta":{"content":"# Notes"}}]}"##,
        ": keep-alive",
        r#"data: {"choices":[{"delta":{"content":null}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"\nBody"}}]}"#,
        r#"data: {"choices":[],"usage":{"total_tokens":42}}"#,
        "data: [DONE]",
        "",
    ]
    .join("\n");
    let (url, request) = serve_once("200 OK", "text/event-stream", sse).await;

    let client = GenerationClient::from_config(&config_for(url));
    let sink = CollectingSink::new();
    let mut written = String::new();
    let summary = client
        .stream_into("make notes", &opts(), &sink, &CancelToken::new(), |s| {
            written.push_str(s);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(written, "# Notes\nBody");
    assert_eq!(summary.source, CompletionSource::Live);
    assert_eq!(summary.chunks, 2);
    assert_eq!(summary.total_chars, 12);
    assert_eq!(summary.tokens_used, Some(42));

    let sent: serde_json::Value = serde_json::from_str(&request.await.unwrap()).unwrap();
    assert_eq!(sent["stream"], true);
}

#[tokio::test]
async fn test_sse_multibyte_char_split_across_reads() {
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"细胞\"}}]}\n\ndata: [DONE]\n\n";
    let bytes = sse.as_bytes();
    // Cut one byte into the first character.
    let cut = sse.find('细').unwrap() + 1;
    let parts = vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()];
    let (url, _request) = serve_in_parts("200 OK", "text/event-stream", parts).await;

    let client = GenerationClient::from_config(&config_for(url));
    let sink = CollectingSink::new();
    let mut written = String::new();
    let summary = client
        .stream_into("make notes", &opts(), &sink, &CancelToken::new(), |s| {
            written.push_str(s);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(written, "细胞");
    assert!(!written.contains('\u{FFFD}'));
    assert_eq!(summary.total_chars, 2);
}

#[tokio::test]
async fn test_raw_stream_reports_api_error() {
    let (url, _request) = serve_once(
        "500 Internal Server Error",
        "text/plain",
        "upstream exploded".to_string(),
    )
    .await;

    let client = GenerationClient::from_config(&config_for(url));
    let mut stream = client.stream("x", &opts());
    match stream.next().await {
        Some(StreamChunk::Error(e)) => assert_eq!(e.category(), "api"),
        other => panic!("expected error chunk, got {:?}", other),
    }
}
