// src/backend.rs

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AssistantConfig;
use crate::error::{BackendError, BackendResult};
use crate::timestamps::Timestamp;

const QUERY_PATH: &str = "rag/query";

/// Body of `POST /rag/query`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryRequest {
    pub video_id: String,
    pub question: String,
    /// Always sent empty; the widget keeps no conversational context.
    pub chat_history: Vec<Value>,
}

impl QueryRequest {
    pub fn new(video_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            question: question.into(),
            chat_history: Vec::new(),
        }
    }
}

/// Successful reply. Every field is optional; missing or mistyped ones are
/// read as absent and the widget falls back on them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default, deserialize_with = "string_or_none")]
    pub answer: Option<String>,
    /// Entries without a numeric `start` are dropped.
    #[serde(default, deserialize_with = "usable_timestamps")]
    pub timestamps: Option<Vec<Timestamp>>,
    /// Set by the backend when its pipeline raised (still HTTP 200).
    #[serde(default, deserialize_with = "string_or_none")]
    pub error: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

fn usable_timestamps<'de, D>(deserializer: D) -> Result<Option<Vec<Timestamp>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items.into_iter().filter_map(Timestamp::from_value).collect(),
    ))
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> BackendResult<QueryResponse>;
}

/// HTTP client for the local RAG service.
#[derive(Clone, Debug)]
pub struct RagClient {
    client: Client,
    base_url: Url,
    query_url: Url,
}

impl RagClient {
    pub fn new(config: &AssistantConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let base_url = config.backend_url.clone();
        let query_url = base_url
            .join(QUERY_PATH)
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            query_url,
        })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }

    /// `GET /` on the backend.
    pub async fn health(&self) -> BackendResult<HealthResponse> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl AnswerBackend for RagClient {
    async fn query(&self, request: &QueryRequest) -> BackendResult<QueryResponse> {
        info!(video_id = %request.video_id, url = %self.query_url, "asking backend");

        let response = self
            .client
            .post(self.query_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: QueryResponse = serde_json::from_str(&body)?;
        if let Some(err) = &parsed.error {
            warn!(video_id = %request.video_id, "backend reported an error: {err}");
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single HTTP response and hands back the raw request it got.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{addr}/"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client_for(base: &str) -> RagClient {
        let config = AssistantConfig::new(base, 600.0, 5, true).unwrap();
        RagClient::new(&config).unwrap()
    }

    fn request_body(raw: &str) -> Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn query_url_is_resolved_against_base() {
        let client = client_for("http://127.0.0.1:8000");
        assert_eq!(client.query_url().as_str(), "http://127.0.0.1:8000/rag/query");
    }

    #[test]
    fn request_serializes_with_empty_history() {
        let json = serde_json::to_value(QueryRequest::new("abc123", "what?")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"video_id": "abc123", "question": "what?", "chat_history": []})
        );
    }

    #[tokio::test]
    async fn posts_question_and_parses_answer() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"answer":"It is about Rust.","timestamps":[{"start":650.0,"text":"borrowing..."},{"start":0}]}"#,
        )
        .await;

        let reply = client_for(&base)
            .query(&QueryRequest::new("dQw4w9WgXcQ", "What is this about?"))
            .await
            .unwrap();

        assert_eq!(reply.answer.as_deref(), Some("It is about Rust."));
        let timestamps = reply.timestamps.unwrap();
        assert_eq!(timestamps.len(), 2);
        assert_eq!(timestamps[0].text.as_deref(), Some("borrowing..."));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /rag/query HTTP/1.1"));
        assert_eq!(
            request_body(&raw),
            serde_json::json!({
                "video_id": "dQw4w9WgXcQ",
                "question": "What is this about?",
                "chat_history": []
            })
        );
    }

    #[tokio::test]
    async fn missing_fields_are_tolerated() {
        let (base, _server) = serve_once("200 OK", "{}").await;
        let reply = client_for(&base)
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap();
        assert_eq!(reply, QueryResponse::default());
    }

    #[test]
    fn bad_timestamp_entries_do_not_lose_the_answer() {
        let reply: QueryResponse = serde_json::from_str(
            r#"{"answer":"Yes.","timestamps":[{"start":650},{"text":"no start"},{"start":null},{"start":1400,"text":"later..."}]}"#,
        )
        .unwrap();
        assert_eq!(reply.answer.as_deref(), Some("Yes."));
        let starts: Vec<f64> = reply.timestamps.unwrap().iter().map(|ts| ts.start).collect();
        assert_eq!(starts, vec![650.0, 1400.0]);
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let reply: QueryResponse =
            serde_json::from_str(r#"{"answer":42,"timestamps":"soon","error":{"code":1}}"#)
                .unwrap();
        assert_eq!(reply, QueryResponse::default());

        let reply: QueryResponse =
            serde_json::from_str(r#"{"answer":null,"timestamps":null}"#).unwrap();
        assert_eq!(reply, QueryResponse::default());
    }

    #[tokio::test]
    async fn mixed_timestamps_over_http_still_answer() {
        let (base, _server) = serve_once(
            "200 OK",
            r#"{"answer":"Yes.","timestamps":[{"start":650},{"text":"no start"}]}"#,
        )
        .await;
        let reply = client_for(&base)
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap();
        assert_eq!(reply.answer.as_deref(), Some("Yes."));
        assert_eq!(reply.timestamps, Some(vec![Timestamp::at(650.0)]));
    }

    #[test]
    fn path_prefixed_base_keeps_its_prefix() {
        let client = client_for("http://127.0.0.1:8000/api");
        assert_eq!(
            client.query_url().as_str(),
            "http://127.0.0.1:8000/api/rag/query"
        );
    }

    #[tokio::test]
    async fn backend_error_field_is_kept() {
        let (base, _server) = serve_once("200 OK", r#"{"error":"no transcript"}"#).await;
        let reply = client_for(&base)
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap();
        assert_eq!(reply.error.as_deref(), Some("no transcript"));
        assert!(reply.answer.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, _server) = serve_once("500 Internal Server Error", "{}").await;
        let err = client_for(&base)
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status(500)));
    }

    #[tokio::test]
    async fn unparseable_body_is_an_error() {
        let (base, _server) = serve_once("200 OK", "<html>oops</html>").await;
        let err = client_for(&base)
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{addr}/"))
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn health_reads_root_message() {
        let (base, server) =
            serve_once("200 OK", r#"{"message":"YouTube RAG API is running"}"#).await;
        let health = client_for(&base).health().await.unwrap();
        assert_eq!(health.message, "YouTube RAG API is running");
        assert!(server.await.unwrap().starts_with("GET / HTTP/1.1"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = AssistantConfig {
            request_timeout: Duration::from_millis(200),
            ..AssistantConfig::new(&format!("http://{addr}/"), 600.0, 5, true).unwrap()
        };
        let err = RagClient::new(&config)
            .unwrap()
            .query(&QueryRequest::new("v", "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
