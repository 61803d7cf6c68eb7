//! Integration tests for the Mandrill backend.
//!
//! These tests run against a small HTTP server on a local port that answers
//! like the Mandrill test sandbox, so they need neither network access nor
//! an API key.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use relaymail_core::{
    BackendOptions, EmailBackend, EmailMessage, Error, MessageId, Outcome, ProviderBackend,
    SendStatus,
};
use relaymail_mandrill::MandrillBackend;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

const TEST_KEY: &str = "test-api-key";

type Handler = fn(&str, &Value) -> (u16, String);

/// A request the mock server received.
#[derive(Debug, Clone)]
struct CapturedRequest {
    path: String,
    body: Value,
}

/// Local HTTP server standing in for the Mandrill API.
struct MockMandrill {
    url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockMandrill {
    async fn start() -> Self {
        Self::with_handler(sandbox).await
    }

    async fn with_handler(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = Arc::clone(&captured);
                tokio::spawn(async move {
                    let _ = serve(stream, handler, captured).await;
                });
            }
        });

        Self {
            url: format!("http://{addr}/api/1.0/"),
            requests,
        }
    }

    fn backend(&self, api_key: &str) -> ProviderBackend<MandrillBackend> {
        self.backend_with(api_key, BackendOptions::default())
    }

    fn backend_with(
        &self,
        api_key: &str,
        options: BackendOptions,
    ) -> ProviderBackend<MandrillBackend> {
        MandrillBackend::new(api_key)
            .unwrap()
            .with_api_url(&self.url)
            .unwrap()
            .with_http_client(local_client())
            .into_backend(options)
    }

    async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }
}

/// Reads one HTTP/1.1 request, answers it and closes the connection.
async fn serve(
    mut stream: TcpStream,
    handler: Handler,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .trim_start_matches("/api/1.0/")
        .to_string();
    let body: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);

    let (status, response) = handler(&path, &body);
    captured.lock().await.push(CapturedRequest { path, body });

    let reason = if status == 200 { "OK" } else { "Internal Server Error" };
    let reply = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
        response.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

/// Answers the way Mandrill's sandbox does for its well-known test inputs.
fn sandbox(_path: &str, body: &Value) -> (u16, String) {
    if body["key"] != TEST_KEY {
        let error = json!({
            "status": "error",
            "code": -1,
            "name": "Invalid_Key",
            "message": "Invalid API key",
        });
        return (500, error.to_string());
    }

    let from = body["message"]["from_email"].as_str().unwrap_or_default();
    if from.ends_with("@localhost") {
        let error = json!({
            "status": "error",
            "code": -2,
            "name": "ValidationError",
            "message": "Validation error: {\"message\":{\"from_email\":\"An email address is invalid\"}}",
        });
        return (500, error.to_string());
    }

    let results: Vec<Value> = body["message"]["to"]
        .as_array()
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, rcpt)| {
            let email = rcpt["email"].as_str().unwrap_or_default();
            let (status, reason) = match email {
                "invalid@localhost" => ("invalid", Value::Null),
                "reject@test.mandrillapp.com" => ("rejected", json!("test")),
                e if e.starts_with("queued@") => ("queued", Value::Null),
                _ => ("sent", Value::Null),
            };
            json!({
                "email": email,
                "status": status,
                "_id": format!("{:032x}", i + 1),
                "reject_reason": reason,
            })
        })
        .collect();

    (200, Value::Array(results).to_string())
}

/// HTTP client that ignores any proxy configured in the environment.
fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn message() -> EmailMessage {
    let mut message =
        EmailMessage::new("Subject", "Text content", "from@example.com", ["to@example.com"]);
    message.attach_alternative("<p>HTML content</p>", "text/html");
    message
}

#[tokio::test]
async fn test_send_mail() {
    let server = MockMandrill::start().await;
    let mut message = message();

    let sent_count = message.send(&server.backend(TEST_KEY)).await.unwrap();
    assert_eq!(sent_count, 1);

    let status = message.status().unwrap();
    let recipient = status.recipient("to@example.com").unwrap();
    let message_id = recipient.message_id.clone().unwrap();

    assert_eq!(recipient.status, SendStatus::Sent);
    assert!(!message_id.is_empty());
    assert_eq!(status.status(), &BTreeSet::from([SendStatus::Sent]));
    assert_eq!(status.message_id(), Some(&MessageId::Single(message_id)));

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "messages/send.json");
    assert_eq!(requests[0].body["message"]["html"], "<p>HTML content</p>");
}

#[tokio::test]
async fn test_invalid_from() {
    let server = MockMandrill::start().await;
    let mut message = message();
    message.from_email = "webmaster@localhost".into();

    let err = message.send(&server.backend(TEST_KEY)).await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("email address is invalid"));
}

#[tokio::test]
async fn test_invalid_to() {
    let server = MockMandrill::start().await;
    let mut message = message();
    message.to = vec!["invalid@localhost".into()];

    let err = message.send(&server.backend(TEST_KEY)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::RecipientsRefused { ref recipients } if recipients == &["invalid@localhost"]
    ));

    let status = message.status().unwrap();
    assert_eq!(
        status.recipient("invalid@localhost").unwrap().status,
        SendStatus::Invalid
    );
    assert_eq!(status.status(), &BTreeSet::from([SendStatus::Invalid]));
}

#[tokio::test]
async fn test_rejected_to() {
    let server = MockMandrill::start().await;
    let mut message = message();
    message.to = vec!["reject@test.mandrillapp.com".into()];

    let err = message.send(&server.backend(TEST_KEY)).await.unwrap_err();
    assert!(err.is_recipients_refused());

    let status = message.status().unwrap();
    assert_eq!(
        status.recipient("reject@test.mandrillapp.com").unwrap().status,
        SendStatus::Rejected
    );
    assert_eq!(status.status(), &BTreeSet::from([SendStatus::Rejected]));
}

#[tokio::test]
async fn test_invalid_api_key() {
    let server = MockMandrill::start().await;
    let mut message = message();

    let err = message
        .send(&server.backend("Hey, that's not an API key!"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("Invalid API key"));
    assert!(message.status().unwrap().is_empty());
}

#[tokio::test]
async fn test_queued_is_indeterminate() {
    let server = MockMandrill::start().await;
    let mut message = message();
    message.to = vec!["queued@example.com".into()];

    assert_eq!(message.send(&server.backend(TEST_KEY)).await.unwrap(), 1);

    let status = message.status().unwrap();
    assert_eq!(status.status(), &BTreeSet::from([SendStatus::Queued]));
    assert_eq!(status.outcome(), Some(Outcome::Queued));
}

#[tokio::test]
async fn test_partial_rejection_is_not_an_error() {
    let server = MockMandrill::start().await;
    let mut message = message().cc("reject@test.mandrillapp.com");

    assert_eq!(message.send(&server.backend(TEST_KEY)).await.unwrap(), 1);

    let status = message.status().unwrap();
    assert_eq!(status.outcome(), Some(Outcome::PartiallyRejected));
    assert_eq!(
        status.status(),
        &BTreeSet::from([SendStatus::Sent, SendStatus::Rejected])
    );
    assert!(matches!(status.message_id(), Some(MessageId::Multiple(ids)) if ids.len() == 2));
}

#[tokio::test]
async fn test_ignore_recipient_status() {
    let server = MockMandrill::start().await;
    let backend = server.backend_with(
        TEST_KEY,
        BackendOptions {
            ignore_recipient_status: true,
            ..BackendOptions::default()
        },
    );
    let mut message = message();
    message.to = vec!["invalid@localhost".into()];

    assert_eq!(message.send(&backend).await.unwrap(), 1);
    assert_eq!(message.status().unwrap().outcome(), Some(Outcome::FullyRejected));
}

#[tokio::test]
async fn test_fail_silently() {
    let server = MockMandrill::start().await;
    let backend = server.backend_with(
        "wrong key",
        BackendOptions {
            fail_silently: true,
            ..BackendOptions::default()
        },
    );

    let mut messages = vec![message(), message()];
    assert_eq!(backend.send_messages(&mut messages).await.unwrap(), 0);
    assert_eq!(server.requests().await.len(), 2);
}

#[tokio::test]
async fn test_status_replaced_on_resend() {
    let server = MockMandrill::start().await;
    let backend = server.backend(TEST_KEY);
    let mut message = message();
    message.to = vec!["reject@test.mandrillapp.com".into()];
    assert!(message.send(&backend).await.is_err());

    message.to = vec!["to@example.com".into()];
    message.send(&backend).await.unwrap();

    let status = message.status().unwrap();
    assert_eq!(status.recipients().len(), 1);
    assert!(status.recipient("reject@test.mandrillapp.com").is_none());
    assert_eq!(status.status(), &BTreeSet::from([SendStatus::Sent]));
}

#[tokio::test]
async fn test_template_send_uses_template_endpoint() {
    let server = MockMandrill::start().await;
    let mut message = message().template("welcome");

    message.send(&server.backend(TEST_KEY)).await.unwrap();

    let requests = server.requests().await;
    assert_eq!(requests[0].path, "messages/send-template.json");
    assert_eq!(requests[0].body["template_name"], "welcome");
}

#[tokio::test]
async fn test_garbled_success_response() {
    fn garbled(_path: &str, _body: &Value) -> (u16, String) {
        (200, "this isn't json".to_string())
    }

    let server = MockMandrill::with_handler(garbled).await;
    let err = message()
        .send(&server.backend(TEST_KEY))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(200));
    assert!(err.to_string().contains("Invalid JSON in Mandrill API response"));
}

#[tokio::test]
async fn test_empty_result_is_not_a_send() {
    fn no_results(_path: &str, _body: &Value) -> (u16, String) {
        (200, "[]".to_string())
    }

    let server = MockMandrill::with_handler(no_results).await;
    let mut message = message();

    let err = message.send(&server.backend(TEST_KEY)).await.unwrap_err();
    assert_eq!(err.status_code(), Some(200));
    assert!(err.to_string().contains("Invalid Mandrill API response format"));
    assert!(message.status().unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = MandrillBackend::new(TEST_KEY)
        .unwrap()
        .with_api_url(format!("http://{addr}/api/1.0/"))
        .unwrap()
        .with_http_client(local_client())
        .into_backend(BackendOptions::default());

    let err = message().send(&backend).await.unwrap_err();
    assert!(matches!(err, Error::Api(ref api) if api.status_code.is_none()));
}

#[tokio::test]
async fn test_local_address_validation_happens_before_request() {
    let server = MockMandrill::start().await;
    let mut message = message();
    message.to = vec!["not-an-address".into()];

    let err = message.send(&server.backend(TEST_KEY)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidAddress(_)));
    assert!(server.requests().await.is_empty());
}
