//! HTTPS implementation of [`RemoteTransport`].
//!
//! Wire contract:
//!
//! - `GET  {base}/v1/suites` returns either an array of suite descriptors or
//!   `{ "suites": [...] }`.
//! - `POST {base}/v1/suites/{suite}/tools/{tool}` takes the tool input as the
//!   JSON body and returns the tool output as the JSON body.
//!
//! Non-success statuses become errors carrying the response text.

use std::fmt::{self, Write as _};
use std::time::Duration;

use agent_adapters::http::{HttpsClient, build_https_client, endpoint, sanitize_base_url, send};
use async_trait::async_trait;
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Method, Request, Uri};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cloud::{RemoteSuiteDescriptor, RemoteTransport};
use crate::error::{RuntimeError, RuntimeResult};

const LABEL: &str = "remote surface";

#[derive(Deserialize)]
#[serde(untagged)]
enum SuiteListing {
    Bare(Vec<RemoteSuiteDescriptor>),
    Wrapped { suites: Vec<RemoteSuiteDescriptor> },
}

/// Remote transport over HTTP(S) with an optional bearer token.
#[derive(Clone)]
pub struct HttpRemoteTransport {
    client: HttpsClient,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for HttpRemoteTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteTransport")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpRemoteTransport {
    /// Creates a transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Fails when the URL has no `http`/`https` scheme or does not parse.
    pub fn new(base_url: impl AsRef<str>) -> RuntimeResult<Self> {
        Ok(Self {
            client: build_https_client(),
            base_url: sanitize_base_url(LABEL, base_url.as_ref())?,
            token: None,
            timeout: Duration::from_secs(30),
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn uri(&self, path: &str) -> RuntimeResult<Uri> {
        Ok(endpoint(LABEL, &self.base_url, path)?)
    }

    fn request(&self, method: Method, uri: Uri, body: Body) -> RuntimeResult<Request<Body>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(body)
            .map_err(|err| RuntimeError::remote(format!("failed to build request: {err}")))
    }
}

#[async_trait]
impl RemoteTransport for HttpRemoteTransport {
    async fn list_suites(&self) -> RuntimeResult<Vec<RemoteSuiteDescriptor>> {
        let request = self.request(Method::GET, self.uri("v1/suites")?, Body::empty())?;
        let bytes = send(&self.client, request, self.timeout, LABEL).await?;
        let listing: SuiteListing = serde_json::from_slice(&bytes)
            .map_err(|err| RuntimeError::remote(format!("invalid suite listing: {err}")))?;

        let suites = match listing {
            SuiteListing::Bare(suites) | SuiteListing::Wrapped { suites } => suites,
        };
        debug!(suites = suites.len(), base = %self.base_url, "remote suites listed");
        Ok(suites)
    }

    async fn invoke(&self, suite: &str, tool: &str, input: Value) -> RuntimeResult<Value> {
        let path = format!(
            "v1/suites/{}/tools/{}",
            encode_segment(suite),
            encode_segment(tool)
        );
        let body = serde_json::to_vec(&input)
            .map_err(|err| RuntimeError::remote(format!("failed to encode input: {err}")))?;
        let request = self.request(Method::POST, self.uri(&path)?, Body::from(body))?;

        let bytes = send(&self.client, request, self.timeout, LABEL).await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| RuntimeError::remote(format!("invalid tool output: {err}")))
    }
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b':') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one HTTP/1.1 exchange and returns the raw request.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn rejects_scheme_less_urls() {
        assert!(HttpRemoteTransport::new("example.com").is_err());
    }

    #[test]
    fn segments_are_percent_encoded() {
        assert_eq!(encode_segment("mcp:docs"), "mcp:docs");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[tokio::test]
    async fn lists_wrapped_suites_with_bearer_token() {
        let (base, server) = one_shot_server(
            "200 OK",
            r#"{"suites":[{"id":"search","tools":[{"name":"query"}]}]}"#,
        )
        .await;
        let transport = HttpRemoteTransport::new(base).unwrap().with_bearer_token("t0k");

        let suites = transport.list_suites().await.unwrap();
        assert_eq!(suites[0].id, "search");
        assert_eq!(suites[0].tools[0].name, "query");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /v1/suites HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer t0k"));
    }

    #[tokio::test]
    async fn invoke_posts_input_and_decodes_output() {
        let (base, server) = one_shot_server("200 OK", r#"{"hits":2}"#).await;
        let transport = HttpRemoteTransport::new(base).unwrap();

        let out = transport
            .invoke("search", "query", json!({ "q": "tokio" }))
            .await
            .unwrap();
        assert_eq!(out, json!({ "hits": 2 }));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/suites/search/tools/query HTTP/1.1"));
        assert!(raw.ends_with(r#"{"q":"tokio"}"#));
    }

    #[tokio::test]
    async fn error_statuses_surface() {
        let (base, server) = one_shot_server("503 Service Unavailable", r#"{"error":"down"}"#).await;
        let transport = HttpRemoteTransport::new(base).unwrap();

        let err = transport.list_suites().await.expect_err("503");
        assert!(err.to_string().contains("503"));
        server.await.unwrap();
    }
}
