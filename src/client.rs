use std::future::Future;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ProbeMode, WidgetConfig};
use crate::error::WidgetError;
use crate::state::ChatMessage;

/// Path of the chat endpoint, relative to the backend origin.
pub const CHAT_PATH: &str = "/api/v1/chat";

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatReply {
    reply: String,
}

/// The two calls the widget makes against its backend.
///
/// The controller is generic over this so it can run against a scripted
/// backend in tests.
pub trait ChatBackend: Send + Sync + 'static {
    /// Lightweight reachability check.
    fn probe(&self) -> impl Future<Output = Result<(), WidgetError>> + Send;

    /// Send the whole transcript and return the assistant's reply text.
    fn chat(
        &self,
        messages: &[ChatMessage],
    ) -> impl Future<Output = Result<String, WidgetError>> + Send;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    origin: Option<String>,
    probe_mode: ProbeMode,
}

impl HttpBackend {
    pub fn new(origin: Option<&str>, probe_mode: ProbeMode) -> Self {
        Self::with_client(Client::new(), origin, probe_mode)
    }

    pub fn with_client(client: Client, origin: Option<&str>, probe_mode: ProbeMode) -> Self {
        Self {
            client,
            origin: origin.map(|o| o.trim_end_matches('/').to_string()),
            probe_mode,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.api_origin.as_deref(), config.probe_mode)
    }

    fn url(&self, path: &str) -> Result<String, WidgetError> {
        let origin = self.origin.as_deref().ok_or(WidgetError::MissingOrigin)?;
        Ok(format!("{}{}", origin, path))
    }

    /// Fetch the widget stylesheet. Used by the markup host to inline it.
    pub async fn fetch_stylesheet(&self, href: &str) -> Result<String, WidgetError> {
        let response = self
            .client
            .get(href)
            .send()
            .await
            .map_err(WidgetError::Transport)?;

        if !response.status().is_success() {
            return Err(WidgetError::Status(response.status()));
        }

        response.text().await.map_err(WidgetError::Decode)
    }
}

impl ChatBackend for HttpBackend {
    async fn probe(&self) -> Result<(), WidgetError> {
        let url = self.url("/")?;

        let response = self
            .client
            .get(&url)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(WidgetError::Transport)?;

        let status = response.status();
        debug!(%url, %status, "readiness probe answered");

        match self.probe_mode {
            ProbeMode::Permissive => Ok(()),
            ProbeMode::Strict if status.is_success() => Ok(()),
            ProbeMode::Strict => Err(WidgetError::Status(status)),
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, WidgetError> {
        let url = self.url(CHAT_PATH)?;

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { messages })
            .send()
            .await
            .map_err(WidgetError::Transport)?;

        if !response.status().is_success() {
            return Err(WidgetError::Status(response.status()));
        }

        let reply: ChatReply = response.json().await.map_err(WidgetError::Decode)?;
        Ok(reply.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one request with a canned response, handing back the raw
    /// request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
        });

        (origin, rx)
    }

    fn test_backend(origin: Option<&str>, probe_mode: ProbeMode) -> HttpBackend {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpBackend::with_client(client, origin, probe_mode)
    }

    async fn closed_origin() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        origin
    }

    #[tokio::test]
    async fn test_chat_posts_transcript_and_reads_reply() {
        let (origin, request) = serve_once("HTTP/1.1 200 OK", r#"{"reply":"**Hola**"}"#).await;
        let backend = test_backend(Some(&origin), ProbeMode::Strict);

        let messages = vec![ChatMessage::user("hola")];
        let reply = backend.chat(&messages).await.unwrap();
        assert_eq!(reply, "**Hola**");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /api/v1/chat HTTP/1.1"));
        assert!(request.contains(r#"{"messages":[{"role":"user","content":"hola"}]}"#));
    }

    #[tokio::test]
    async fn test_chat_rejects_error_status() {
        let (origin, _request) = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;
        let backend = test_backend(Some(&origin), ProbeMode::Permissive);

        let err = backend.chat(&[ChatMessage::user("hola")]).await.unwrap_err();
        assert!(matches!(err, WidgetError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_chat_rejects_body_without_reply() {
        let (origin, _request) = serve_once("HTTP/1.1 200 OK", r#"{"answer":"x"}"#).await;
        let backend = test_backend(Some(&origin), ProbeMode::Permissive);

        let err = backend.chat(&[ChatMessage::user("hola")]).await.unwrap_err();
        assert!(matches!(err, WidgetError::Decode(_)));
    }

    #[tokio::test]
    async fn test_permissive_probe_accepts_any_status() {
        let (origin, request) = serve_once("HTTP/1.1 404 Not Found", "{}").await;
        let backend = test_backend(Some(&origin), ProbeMode::Permissive);

        backend.probe().await.unwrap();
        let request = request.await.unwrap();
        assert!(request.starts_with("GET / HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("cache-control: no-store"));
    }

    #[tokio::test]
    async fn test_strict_probe_requires_success_status() {
        let (origin, _request) = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;
        let backend = test_backend(Some(&origin), ProbeMode::Strict);

        let err = backend.probe().await.unwrap_err();
        assert!(matches!(err, WidgetError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_probe_against_closed_port_is_transport_error() {
        let backend = test_backend(Some(&closed_origin().await), ProbeMode::Permissive);

        let err = backend.probe().await.unwrap_err();
        assert!(matches!(err, WidgetError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_origin_is_not_retryable() {
        let backend = test_backend(None, ProbeMode::Permissive);

        let err = backend.probe().await.unwrap_err();
        assert!(matches!(err, WidgetError::MissingOrigin));
        assert!(!err.is_retryable());
    }
}
