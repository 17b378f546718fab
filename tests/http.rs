//! HTTP client tests against a loopback responder.
//!
//! Each test binds a one-shot server on 127.0.0.1, points the real client at
//! it, and checks both the request that went out and how the reply was
//! decoded.
//!
//! Run with:
//!   cargo test --test http

use std::path::Path;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use verdict_pipeline::extract::ocr_params;
use verdict_pipeline::{
    ChatMessage, ChatOptions, ChatProvider, FileError, OcrConfig, OcrProvider,
    OpenAiCompatibleClient, PageContent, PageOutcome, TyphoonOcrClient,
};

// ── Loopback responder ───────────────────────────────────────────────────────

/// Accept one connection, capture the raw request, answer with `status` + `body`.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let request = read_request(&mut sock).await;
        let response = format!(
            "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\n\
             content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        request
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        if head.contains("transfer-encoding: chunked") {
            if buf.ends_with(b"0\r\n\r\n") {
                break;
            }
            continue;
        }
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + len {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn sample_pdf(tmp: &TempDir) -> std::path::PathBuf {
    let path = tmp.path().join("1234-2566.pdf");
    std::fs::write(&path, b"%PDF-1.4 test").unwrap();
    path
}

// ── OCR client ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ocr_client_uploads_multipart_and_decodes_pages() {
    let body = r#"{"results":[
        {"success":true,"filename":"1234-2566.pdf","message":{"choices":[{"message":{"content":"{\"natural_text\":\"หน้า 1\"}"}}]}},
        {"success":false,"filename":"1234-2566.pdf","error":"page 2 failed"},
        {"success":true,"filename":"1234-2566.pdf","message":{"choices":[{"message":{"content":"หน้า 3"}}]}}
    ]}"#;
    let (url, server) = serve_once(200, body).await;
    let tmp = TempDir::new().unwrap();
    let pdf = sample_pdf(&tmp);

    let client = TyphoonOcrClient::with_http_client(http(), format!("{url}/v1/ocr"), "test-key");
    let params = ocr_params(&OcrConfig::default());
    let doc = client.extract(&pdf, &params).await.unwrap();

    assert_eq!(doc.pages.len(), 3);
    assert_eq!(
        doc.pages[0],
        PageOutcome::Extracted(PageContent::Structured {
            natural_text: "หน้า 1".into()
        })
    );
    assert_eq!(doc.failed_pages(), 1);
    assert_eq!(doc.text().as_deref(), Some("หน้า 1\nหน้า 3"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/ocr "), "got: {request}");
    let lower = request.to_lowercase();
    assert!(lower.contains("authorization: bearer test-key"));
    assert!(lower.contains("content-type: multipart/form-data"));
    assert!(request.contains(r#"name="file"; filename="1234-2566.pdf""#));
    assert!(request.contains("application/pdf"));
    assert!(request.contains("%PDF-1.4 test"));
    assert!(request.contains(r#"name="model""#));
    assert!(request.contains("typhoon-ocr"));
    assert!(request.contains(r#"name="max_tokens""#));
    assert!(request.contains("16384"));
    assert!(request.contains("[1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22]"));
}

#[tokio::test]
async fn ocr_client_non_200_is_status_error() {
    let (url, server) = serve_once(401, r#"{"error":"invalid api key"}"#).await;
    let tmp = TempDir::new().unwrap();
    let pdf = sample_pdf(&tmp);

    let client = TyphoonOcrClient::with_http_client(http(), url, "bad-key");
    let err = client
        .extract(&pdf, &ocr_params(&OcrConfig::default()))
        .await
        .unwrap_err();
    server.await.unwrap();

    match err {
        FileError::Status { code, body } => {
            assert_eq!(code, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn ocr_client_missing_file_is_io_error() {
    let client = TyphoonOcrClient::with_http_client(http(), "http://127.0.0.1:9", "k");
    let err = client
        .extract(Path::new("/nonexistent/a.pdf"), &ocr_params(&OcrConfig::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::Io { .. }), "got {err:?}");
}

// ── Chat client ──────────────────────────────────────────────────────────────

fn chat_options() -> ChatOptions {
    ChatOptions {
        model: "google/gemini-3-flash-preview".into(),
        temperature: 0.1,
    }
}

#[tokio::test]
async fn chat_client_posts_openai_request() {
    let body = r#"{"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"เรื่อง: ทดสอบ"}}]}"#;
    let (url, server) = serve_once(200, body).await;

    let client = OpenAiCompatibleClient::with_http_client(http(), format!("{url}/api/v1/"), "sk-or-test");
    let reply = client
        .chat(
            &[ChatMessage::system("rules"), ChatMessage::user("Filename: a.txt")],
            &chat_options(),
        )
        .await
        .unwrap();
    assert_eq!(reply, "เรื่อง: ทดสอบ");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/v1/chat/completions "), "got: {request}");
    assert!(request.to_lowercase().contains("authorization: bearer sk-or-test"));

    let json_start = request.find("\r\n\r\n").unwrap() + 4;
    let sent: serde_json::Value = serde_json::from_str(&request[json_start..]).unwrap();
    assert_eq!(sent["model"], "google/gemini-3-flash-preview");
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][1]["content"], "Filename: a.txt");
}

#[tokio::test]
async fn chat_client_error_status_and_empty_reply() {
    let (url, server) = serve_once(402, r#"{"error":{"message":"insufficient credits"}}"#).await;
    let client = OpenAiCompatibleClient::with_http_client(http(), url, "k");
    let err = client
        .chat(&[ChatMessage::user("x")], &chat_options())
        .await
        .unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, FileError::Status { code: 402, .. }), "got {err:?}");

    let (url, server) = serve_once(200, r#"{"choices":[]}"#).await;
    let client = OpenAiCompatibleClient::with_http_client(http(), url, "k");
    let err = client
        .chat(&[ChatMessage::user("x")], &chat_options())
        .await
        .unwrap_err();
    server.await.unwrap();
    assert_eq!(err, FileError::EmptyReply);
}
