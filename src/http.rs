//! HTTP seam for collector, decision and cart calls.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail on non-2xx, otherwise parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for non-2xx responses and
    /// [`Error::MalformedResponse`] when the body is not JSON.
    pub fn json(&self) -> Result<Value> {
        if !self.is_success() {
            return Err(Error::Status(self.status));
        }
        serde_json::from_str(&self.body).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

/// Outbound HTTP used by the agent.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST a JSON body.
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse>;

    /// GET expecting JSON.
    async fn get_json(&self, url: &str) -> Result<HttpResponse>;
}

/// `reqwest`-backed client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn get_json(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// A request seen by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Target URL.
    pub url: String,
    /// JSON body for POSTs.
    pub body: Option<Value>,
}

/// Canned-response client for tests and offline replays.
///
/// Responses are matched by URL in FIFO order per URL. A URL with no queued
/// response fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<Vec<(String, VecDeque<Result<HttpResponse>>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedClient {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `url`.
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.push(
            url,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Queue a transport failure for `url`.
    pub fn fail(&self, url: &str, message: &str) {
        self.push(url, Err(Error::Http(message.to_string())));
    }

    /// Every request seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests sent to `url`.
    #[must_use]
    pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }

    fn push(&self, url: &str, response: Result<HttpResponse>) {
        if let Ok(mut responses) = self.responses.lock() {
            if let Some((_, queue)) = responses.iter_mut().find(|(u, _)| u == url) {
                queue.push_back(response);
            } else {
                responses.push((url.to_string(), VecDeque::from([response])));
            }
        }
    }

    fn next(&self, request: RecordedRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut responses| {
                responses
                    .iter_mut()
                    .find(|(u, _)| *u == url)
                    .and_then(|(_, queue)| queue.pop_front())
            })
            .unwrap_or_else(|| Err(Error::Http(format!("no scripted response for {url}"))))
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        self.next(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
        })
    }

    async fn get_json(&self, url: &str) -> Result<HttpResponse> {
        self.next(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            body: None,
        })
    }
}
