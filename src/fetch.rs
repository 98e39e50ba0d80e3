//! Fetch gate: one best-effort network call, normalized into a typed result
//!
//! The gate never retries and never panics. A failed call leaves whatever the
//! caller had before untouched; the next scheduled refresh is the retry.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;

/// HTTP method of a content request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Expected body type of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    Text,
}

/// Caller-supplied filters forwarded verbatim with a screen's request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenParams {
    pub query: Vec<(String, String)>,
    pub body: Map<String, Value>,
}

impl ScreenParams {
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }
}

/// A request against the content server
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    /// Path relative to the server base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub expect: Expect,
}

impl FetchRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            expect: Expect::Json,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            expect: Expect::Json,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn expecting(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Merge caller filters into this request without altering them
    pub fn with_params(mut self, params: &ScreenParams) -> Self {
        self.query.extend(params.query.iter().cloned());

        if !params.body.is_empty() {
            let mut body = match self.body.take() {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            for (key, value) in &params.body {
                body.insert(key.clone(), value.clone());
            }
            self.body = Some(Value::Object(body));
        }

        self
    }

    /// Path plus encoded query string
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

/// Undecoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(Value),
    Text(String),
}

impl RawPayload {
    /// Take the JSON value, parsing text bodies, or fail with a payload error
    pub fn into_json(self) -> Result<Value, FetchError> {
        match self {
            RawPayload::Json(value) => Ok(value),
            RawPayload::Text(text) => serde_json::from_str(&text).map_err(FetchError::from),
        }
    }
}

/// Per-screen fetch lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Network seam between the engine and the content server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request and return its body
    async fn send(&self, request: &FetchRequest) -> Result<RawPayload, FetchError>;

    /// Download raw bytes from an absolute URL
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> Result<RawPayload, FetchError> {
        let url = format!("{}{}", self.base_url, request.path_and_query());

        tracing::debug!("{:?} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder.header("Content-Type", "application/json");
        if request.expect == Expect::Json {
            builder = builder.header("Accept", "application/json");
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(FetchError::status(response.status().as_u16()));
        }

        let text = response.text().await?;

        match request.expect {
            Expect::Json => Ok(RawPayload::Json(serde_json::from_str(&text)?)),
            Expect::Text => Ok(RawPayload::Text(text)),
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).header("Accept", "image/*").send().await?;

        if !response.status().is_success() {
            return Err(FetchError::status(response.status().as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Performs a screen's fetch and decodes it through the screen's feed
#[derive(Clone)]
pub struct FetchGate {
    transport: Arc<dyn Transport>,
}

impl FetchGate {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Exactly one attempt; the result is never applied here
    pub async fn fetch(
        &self,
        feed: &dyn Feed,
        params: &ScreenParams,
    ) -> Result<FeedSnapshot, FetchError> {
        let request = feed.request().with_params(params);
        let payload = self.transport.send(&request).await?;
        feed.decode(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn router() -> Router {
        Router::new()
            .route("/ok", get(|| async { Json(json!([1, 2, 3])) }))
            .route(
                "/fail",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/html", get(|| async { "<html>oops</html>" }))
            .route(
                "/echo",
                post(
                    |axum::extract::RawQuery(query): axum::extract::RawQuery,
                     Json(body): Json<Value>| async move {
                        Json(json!({ "query": query, "body": body }))
                    },
                ),
            )
    }

    #[tokio::test]
    async fn test_success_returns_json() {
        let base = serve(router()).await;
        let transport = HttpTransport::new(Client::new(), base);

        let payload = transport.send(&FetchRequest::get("/ok")).await.unwrap();
        assert_eq!(payload, RawPayload::Json(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_non_2xx_is_network_error_with_status() {
        let base = serve(router()).await;
        let transport = HttpTransport::new(Client::new(), base);

        let err = transport.send(&FetchRequest::get("/fail")).await.unwrap_err();
        assert_eq!(err.http_status(), Some(500));
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_non_json_is_payload_error() {
        let base = serve(router()).await;
        let transport = HttpTransport::new(Client::new(), base);

        let err = transport.send(&FetchRequest::get("/html")).await.unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 on localhost is essentially never listening
        let transport = HttpTransport::new(Client::new(), "http://127.0.0.1:9");
        let err = transport.send(&FetchRequest::get("/ok")).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { status: None, .. }));
    }

    #[tokio::test]
    async fn test_params_forwarded_verbatim() {
        let base = serve(router()).await;
        let transport = HttpTransport::new(Client::new(), base);

        let params = ScreenParams::default()
            .with_query("window", "last 24h")
            .with_body_field("bucket", "long");
        let request = FetchRequest::post("/echo", json!({ "ipad": "1" })).with_params(&params);

        let payload = transport.send(&request).await.unwrap().into_json().unwrap();
        assert_eq!(payload["query"], json!("window=last%2024h"));
        assert_eq!(payload["body"], json!({ "ipad": "1", "bucket": "long" }));
    }
}
