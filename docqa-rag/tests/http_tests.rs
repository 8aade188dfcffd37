//! The chat and embeddings clients against a loopback HTTP server.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use docqa_rag::{
    ChatCompletionsClient, ChatMessage, EmbeddingProvider, Generator, LlmConfig,
    OpenAIEmbeddingProvider, RagError,
};
use serde_json::{Value, json};

/// What the server saw: the lower-cased request head and the raw body.
struct Received {
    head: String,
    body: String,
}

impl Received {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> Received {
    let mut buf = Vec::new();
    let mut block = [0u8; 4096];
    let mut expected: Option<(usize, usize)> = None;
    loop {
        if let Some((start, len)) = expected {
            if buf.len() >= start + len {
                let head = String::from_utf8_lossy(&buf[..start]).to_ascii_lowercase();
                let body = String::from_utf8_lossy(&buf[start..start + len]).into_owned();
                return Received { head, body };
            }
        }
        let n = stream.read(&mut block).unwrap();
        assert!(n > 0, "client closed before sending a full request");
        buf.extend_from_slice(&block[..n]);

        if expected.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(0);
                expected = Some((end + 4, len));
            }
        }
    }
}

/// Answer one request with `status` and a JSON body. Returns the base URL to
/// point a client at and a receiver for the request it sent.
fn respond_once(status: &'static str, body: Value) -> (String, mpsc::Receiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        tx.send(request).unwrap();
    });
    (base_url, rx)
}

/// Accept one request and never reply.
fn never_respond() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        thread::sleep(Duration::from_secs(10));
    });
    base_url
}

fn invalid_key_body() -> Value {
    json!({"error": {"message": "Invalid API Key", "type": "invalid_request_error"}})
}

fn chat_client(base_url: &str) -> LlmConfig {
    LlmConfig::groq("gsk-test").with_base_url(base_url).with_model("llama-test")
}

fn question() -> Vec<ChatMessage> {
    vec![ChatMessage::system("Context: revenue was $5M."), ChatMessage::user("What was revenue?")]
}

// ── chat completions ────────────────────────────────────────────────

#[tokio::test]
async fn chat_reply_is_first_choice_content() {
    let (base_url, received) = respond_once(
        "200 OK",
        json!({
            "id": "chatcmpl-7",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Revenue was $5M."}}]
        }),
    );
    let client = ChatCompletionsClient::new(chat_client(&base_url).with_temperature(0.0)).unwrap();

    let answer = client.generate(&question()).await.unwrap();
    assert_eq!(answer, "Revenue was $5M.");

    let request = received.recv().unwrap();
    assert!(request.head.starts_with("post /v1/chat/completions "));
    assert!(request.head.contains("authorization: bearer gsk-test"));
    let body = request.json();
    assert_eq!(body["model"], "llama-test");
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "What was revenue?"}));
}

#[tokio::test]
async fn chat_api_error_carries_server_message() {
    let (base_url, _received) = respond_once("401 Unauthorized", invalid_key_body());
    let client = ChatCompletionsClient::new(chat_client(&base_url)).unwrap();

    match client.generate(&question()).await {
        Err(RagError::Generation { message, .. }) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("Invalid API Key"), "{message}");
        }
        other => panic!("expected a generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_request_gives_up_after_timeout() {
    let base_url = never_respond();
    let client =
        ChatCompletionsClient::new(chat_client(&base_url).with_timeout(Duration::from_secs(1))).unwrap();

    let started = Instant::now();
    let result = client.generate(&question()).await;
    let waited = started.elapsed();

    match result {
        Err(RagError::Generation { message, .. }) => assert!(message.contains("timed out"), "{message}"),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_millis(900), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(5), "returned after {waited:?}");
}

// ── embeddings ──────────────────────────────────────────────────────

fn embedder(base_url: &str) -> OpenAIEmbeddingProvider {
    OpenAIEmbeddingProvider::new("sk-test")
        .unwrap()
        .with_base_url(base_url)
        .with_model("embed-test")
        .with_dimensions(2)
}

#[tokio::test]
async fn embeddings_follow_input_order() {
    let (base_url, received) = respond_once(
        "200 OK",
        json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ]
        }),
    );

    let vectors = embedder(&base_url).embed_batch(&["net revenue", "operating cost"]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

    let request = received.recv().unwrap();
    assert!(request.head.starts_with("post /v1/embeddings "));
    assert!(request.head.contains("authorization: bearer sk-test"));
    assert_eq!(
        request.json(),
        json!({"model": "embed-test", "input": ["net revenue", "operating cost"], "dimensions": 2})
    );
}

#[tokio::test]
async fn embeddings_api_error_carries_server_message() {
    let (base_url, _received) = respond_once("401 Unauthorized", invalid_key_body());

    match embedder(&base_url).embed("net revenue").await {
        Err(RagError::Embedding { message, .. }) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("Invalid API Key"), "{message}");
        }
        other => panic!("expected an embedding error, got {other:?}"),
    }
}

#[tokio::test]
async fn embeddings_request_gives_up_after_timeout() {
    let base_url = never_respond();
    let provider = embedder(&base_url).with_timeout(Duration::from_secs(1)).unwrap();

    let started = Instant::now();
    let result = provider.embed("net revenue").await;
    let waited = started.elapsed();

    match result {
        Err(RagError::Embedding { message, .. }) => assert!(message.contains("timed out"), "{message}"),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_millis(900), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(5), "returned after {waited:?}");
}
