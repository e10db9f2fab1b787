//! Streaming Integration Tests
//!
//! Completion clients against a local one-shot HTTP server, plus the stream
//! accumulator over awkwardly split byte streams.

use bytes::Bytes;
use futures_util::stream;
use review_analyzer::models::ModelId;
use review_analyzer::streaming::{
    accumulate_stream, ApiKey, ClientFactory, EndpointSettings, LlmClient, MistralClient,
    OpenAiClient,
};
use review_analyzer::{AnalyzerError, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SSE_OK: &str = "HTTP/1.1 200 OK\r\n\
content-type: text/event-stream\r\n\
connection: close\r\n\
\r\n\
data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"Breakfast \"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"was cold.\"}}]}\n\n\
data: [DONE]\n\n";

const SSE_TRUNCATED: &str = "HTTP/1.1 200 OK\r\n\
content-type: text/event-stream\r\n\
connection: close\r\n\
\r\n\
data: {\"choices\":[{\"delta\":{\"content\":\"Breakfast \"}}]}\n\n";

const UNAUTHORIZED_BODY: &str = "{\"error\":{\"message\":\"Incorrect API key provided\"}}";

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Serve one canned response; the received request is sent back on the channel
async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
    serve(response, None).await
}

/// Like `serve_once`, but keep the connection open for `hold` after writing
async fn serve(response: String, hold: Option<Duration>) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&request) {
                let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        socket.write_all(response.as_bytes()).await.unwrap();
        if let Some(hold) = hold {
            tokio::time::sleep(hold).await;
        }
        let _ = socket.shutdown().await;
    });

    (format!("http://{}/v1", addr), rx)
}

fn timeout() -> Duration {
    Duration::from_secs(10)
}

#[tokio::test]
async fn test_openai_client_streams_chunks() {
    let (base_url, request) = serve_once(SSE_OK.to_string()).await;
    let client = OpenAiClient::new(&base_url, ApiKey::new("sk-test"), timeout()).unwrap();

    let mut chunks = Vec::new();
    let mut sink = |chunk: &str| chunks.push(chunk.to_string());
    let text = client.complete("Review data", "Be brief", &mut sink).await.unwrap();

    assert_eq!(text, "Breakfast was cold.");
    assert_eq!(chunks, vec!["Breakfast ", "was cold."]);

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.contains("Bearer sk-test") || request.contains("bearer sk-test"));
    assert!(request.contains("\"model\":\"gpt-4-turbo-preview\""));
    assert!(request.contains("\"stream\":true"));
    assert!(request.contains("\"role\":\"system\""));
}

#[tokio::test]
async fn test_mistral_client_request_body() {
    let (base_url, request) = serve_once(SSE_OK.to_string()).await;
    let client = MistralClient::new(&base_url, ApiKey::new("ms-test"), timeout()).unwrap();

    let mut sink = |_: &str| {};
    let text = client.complete("Review data", "Be brief", &mut sink).await.unwrap();
    assert_eq!(text, "Breakfast was cold.");

    let request = request.await.unwrap();
    assert!(request.contains("\"model\":\"open-mistral-7b\""));
    assert!(request.contains("\"safe_prompt\":false"));
}

#[tokio::test]
async fn test_http_error_is_api_error() {
    let response = format!(
        "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        UNAUTHORIZED_BODY.len(),
        UNAUTHORIZED_BODY
    );
    let (base_url, _request) = serve_once(response).await;
    let client = OpenAiClient::new(&base_url, ApiKey::new("sk-bad"), timeout()).unwrap();

    let mut chunks = 0usize;
    let mut sink = |_: &str| chunks += 1;
    let err = client.complete("x", "y", &mut sink).await.unwrap_err();

    assert!(matches!(err, AnalyzerError::LlmApiError { .. }));
    assert!(err.to_string().contains("401"));
    assert_eq!(chunks, 0);
}

#[tokio::test]
async fn test_truncated_stream_is_error() {
    let (base_url, _request) = serve_once(SSE_TRUNCATED.to_string()).await;
    let factory = ClientFactory::new(EndpointSettings {
        openai_base_url: base_url,
        ..EndpointSettings::default()
    })
    .with_key(ModelId::Gpt4Turbo, ApiKey::new("sk-test"));
    let client = factory.client_for(ModelId::Gpt4Turbo).unwrap();

    let mut seen = String::new();
    let mut sink = |chunk: &str| seen.push_str(chunk);
    let err = client.complete("x", "y", &mut sink).await.unwrap_err();

    assert!(matches!(err, AnalyzerError::StreamingError(_)));
    assert_eq!(seen, "Breakfast ");
}

#[tokio::test]
async fn test_stalled_stream_hits_idle_timeout() {
    let (base_url, _request) = serve(SSE_TRUNCATED.to_string(), Some(Duration::from_secs(5))).await;
    let client =
        OpenAiClient::new(&base_url, ApiKey::new("sk-test"), Duration::from_millis(200)).unwrap();

    let mut seen = String::new();
    let mut sink = |chunk: &str| seen.push_str(chunk);
    let err = client.complete("x", "y", &mut sink).await.unwrap_err();

    assert!(matches!(err, AnalyzerError::StreamingError(ref m) if m.contains("stalled")));
    assert_eq!(seen, "Breakfast ");
}

#[tokio::test]
async fn test_silent_server_hits_idle_timeout() {
    let (base_url, _request) = serve(String::new(), Some(Duration::from_secs(5))).await;
    let client =
        MistralClient::new(&base_url, ApiKey::new("ms-test"), Duration::from_millis(200)).unwrap();

    let mut sink = |_: &str| {};
    let err = client.complete("x", "y", &mut sink).await.unwrap_err();

    assert!(matches!(err, AnalyzerError::LlmApiError { .. }));
    assert!(err.to_string().contains("No response within"));
}

#[tokio::test]
async fn test_byte_level_splits() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Frühstück \"}}]}\r\n\r\n\
                data: {\"choices\":[{\"delta\":{\"content\":\"kalt\"}}]}\r\n\r\n\
                data: [DONE]\r\n\r\n";
    // One byte at a time splits every multi-byte character
    let parts: Vec<Result<Bytes>> = body
        .as_bytes()
        .iter()
        .map(|b| Ok(Bytes::copy_from_slice(&[*b])))
        .collect();

    let mut chunks = Vec::new();
    let mut sink = |chunk: &str| chunks.push(chunk.to_string());
    let text = accumulate_stream("Mistral", stream::iter(parts), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(text, "Frühstück kalt");
    assert_eq!(chunks, vec!["Frühstück ", "kalt"]);
}

#[tokio::test]
async fn test_error_event_aborts_stream() {
    let parts: Vec<Result<Bytes>> = vec![
        Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
        )),
        Ok(Bytes::from_static(
            b"data: {\"error\":{\"message\":\"rate limit reached\"}}\n\n",
        )),
    ];
    let mut sink = |_: &str| {};
    let err = accumulate_stream("OpenAI", stream::iter(parts), &mut sink, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("rate limit reached"));
}

/// Any two-way split of a well-formed body decodes to the same text
#[quickcheck_macros::quickcheck]
fn prop_split_point_does_not_matter(split: usize) -> bool {
    let body: &[u8] = "data: {\"choices\":[{\"delta\":{\"content\":\"Très \"}}]}\n\n\
                       data: {\"choices\":[{\"delta\":{\"content\":\"bien\"}}]}\n\n\
                       data: [DONE]\n\n"
        .as_bytes();
    let at = split % (body.len() + 1);
    let parts: Vec<Result<Bytes>> = vec![
        Ok(Bytes::copy_from_slice(&body[..at])),
        Ok(Bytes::copy_from_slice(&body[at..])),
    ];

    let mut sink = |_: &str| {};
    let text = tokio_test::block_on(accumulate_stream("OpenAI", stream::iter(parts), &mut sink, None));
    matches!(text.as_deref(), Ok("Très bien"))
}
