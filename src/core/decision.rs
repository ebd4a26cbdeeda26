//! Remote-decided interstitial prompts with a local cooldown.
//!
//! The gate is `Idle` until a prompt is shown, then `CooldownActive` until
//! `last_decision_at + cooldown` has passed. While cooling down no request
//! is made at all. The remote service owns message content and the
//! show/no-show call; a cooldown it sends applies to the window that starts
//! with that prompt.

use crate::core::clock::Clock;
use crate::core::page::PageCategory;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What triggered a decision check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// One-off check shortly after load.
    Boot,
    /// Fixed cadence.
    Interval,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boot => "boot",
            Self::Interval => "interval",
        })
    }
}

/// Behavioural snapshot sent with each decision request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRequest {
    /// Session identifier.
    pub session_id: String,
    /// Category of the current page.
    pub current_page: PageCategory,
    /// Current URL.
    pub url: String,
    /// Last known cart item count.
    pub cart_items: u64,
    /// Visible seconds across all pages.
    pub time_on_site: u64,
    /// Unix seconds when the agent started.
    pub started_at: i64,
}

/// A prompt the remote service asked to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Text to show.
    pub message: String,

    /// Optional category or tone hint for the presentation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Result of one gate check.
#[derive(Debug)]
pub enum DecisionOutcome {
    /// Still inside the cooldown window; no request made.
    CoolingDown {
        /// Milliseconds until the window closes.
        remaining_ms: i64,
    },
    /// Service declined, or answered without a usable message.
    NoPrompt,
    /// Service asked for a prompt; the cooldown has been restarted.
    Show(Prompt),
    /// Transport failure, non-2xx, or a body that is not JSON.
    Failed(Error),
}

/// Fields of a decision response we act on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    prompt: Option<Prompt>,
    cooldown_ms: Option<i64>,
}

impl Verdict {
    /// Interpret a response body, flat or nested under `decision`.
    fn from_value(body: &Value) -> Self {
        let decision = body
            .get("decision")
            .filter(|d| d.is_object())
            .unwrap_or(body);

        let show = decision.get("show").and_then(Value::as_bool).unwrap_or(false);
        let message = decision
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty());
        let category = decision
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string);
        let cooldown_ms = decision
            .get("cooldownMs")
            .or_else(|| decision.get("cooldown_ms"))
            .and_then(Value::as_i64)
            .filter(|ms| *ms >= 0);

        let prompt = match (show, message) {
            (true, Some(message)) => Some(Prompt {
                message: message.to_string(),
                category,
            }),
            _ => None,
        };
        Self {
            prompt,
            cooldown_ms,
        }
    }
}

/// Cooldown-throttled decision requests.
pub struct DecisionGate {
    endpoint: String,
    default_cooldown: Duration,
    cooldown: Duration,
    last_decision_at: Option<DateTime<Utc>>,
    http: Arc<dyn HttpClient>,
}

impl DecisionGate {
    /// Create a gate asking `endpoint`, never having shown a prompt.
    #[must_use]
    pub fn new(endpoint: &str, default_cooldown_ms: i64, http: Arc<dyn HttpClient>) -> Self {
        let default_cooldown = Duration::milliseconds(default_cooldown_ms);
        Self {
            endpoint: endpoint.to_string(),
            default_cooldown,
            cooldown: default_cooldown,
            last_decision_at: None,
            http,
        }
    }

    /// When a prompt was last shown. `None` means never.
    #[must_use]
    pub fn last_decision_at(&self) -> Option<DateTime<Utc>> {
        self.last_decision_at
    }

    /// Cooldown applying to the current window.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time left in the cooldown window, if one is active.
    #[must_use]
    pub fn remaining_cooldown(&self, now: DateTime<Utc>) -> Option<Duration> {
        let since = now - self.last_decision_at?;
        (since < self.cooldown).then(|| self.cooldown - since)
    }

    /// Ask the service, unless cooling down.
    ///
    /// `snapshot` is only called when a request is actually made. A shown
    /// prompt starts its cooldown at the time the response arrived.
    pub async fn check(
        &mut self,
        clock: &dyn Clock,
        snapshot: impl FnOnce() -> DecisionRequest,
    ) -> DecisionOutcome {
        if let Some(remaining) = self.remaining_cooldown(clock.now()) {
            return DecisionOutcome::CoolingDown {
                remaining_ms: remaining.num_milliseconds(),
            };
        }

        let verdict = match self.request(&snapshot()).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "decision request failed");
                return DecisionOutcome::Failed(e);
            }
        };

        match verdict.prompt {
            Some(prompt) => {
                self.last_decision_at = Some(clock.now());
                self.cooldown = verdict
                    .cooldown_ms
                    .map_or(self.default_cooldown, Duration::milliseconds);
                debug!(
                    cooldown_ms = self.cooldown.num_milliseconds(),
                    "decision service asked for a prompt"
                );
                DecisionOutcome::Show(prompt)
            }
            None => DecisionOutcome::NoPrompt,
        }
    }

    async fn request(&self, request: &DecisionRequest) -> Result<Verdict> {
        let body = serde_json::to_value(request)?;
        let response = self.http.post_json(&self.endpoint, &body).await?;
        let value = response.json()?;
        Ok(Verdict::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::http::{HttpResponse, ScriptedClient};
    use async_trait::async_trait;
    use serde_json::json;

    const EVALUATE: &str = "http://decide.test/evaluate";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn snapshot() -> DecisionRequest {
        DecisionRequest {
            session_id: "s-1".to_string(),
            current_page: PageCategory::Product,
            url: "https://shop.example.com/products/shoe-1".to_string(),
            cart_items: 1,
            time_on_site: 42,
            started_at: 1_700_000_000,
        }
    }

    fn gate() -> (DecisionGate, Arc<ScriptedClient>, ManualClock) {
        let http = Arc::new(ScriptedClient::new());
        (
            DecisionGate::new(EVALUATE, 180_000, http.clone()),
            http,
            ManualClock::new(at(0)),
        )
    }

    /// Advances the clock while the request is in flight.
    struct SlowClient {
        inner: ScriptedClient,
        clock: Arc<ManualClock>,
        latency: Duration,
    }

    #[async_trait]
    impl HttpClient for SlowClient {
        async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
            self.clock.advance(self.latency);
            self.inner.post_json(url, body).await
        }

        async fn get_json(&self, url: &str) -> Result<HttpResponse> {
            self.clock.advance(self.latency);
            self.inner.get_json(url).await
        }
    }

    #[test]
    fn verdict_reads_flat_response() {
        let verdict = Verdict::from_value(&json!({
            "show": true, "message": "Free shipping today", "cooldownMs": 60000, "category": "promo"
        }));
        assert_eq!(
            verdict.prompt,
            Some(Prompt {
                message: "Free shipping today".to_string(),
                category: Some("promo".to_string()),
            })
        );
        assert_eq!(verdict.cooldown_ms, Some(60_000));
    }

    #[test]
    fn verdict_reads_nested_response() {
        let verdict = Verdict::from_value(&json!({
            "decision": {"show": true, "message": "Hi", "cooldown_ms": 5000}
        }));
        assert!(verdict.prompt.is_some());
        assert_eq!(verdict.cooldown_ms, Some(5_000));
    }

    #[test]
    fn verdict_without_message_is_no_prompt() {
        assert!(Verdict::from_value(&json!({"show": true})).prompt.is_none());
        assert!(Verdict::from_value(&json!({"show": true, "message": "  "})).prompt.is_none());
        assert!(Verdict::from_value(&json!({"show": false, "message": "x"})).prompt.is_none());
        assert!(Verdict::from_value(&json!([1, 2])).prompt.is_none());
    }

    #[tokio::test]
    async fn first_check_is_never_blocked() {
        let (mut gate, http, clock) = gate();
        http.respond(EVALUATE, 200, r#"{"show": false}"#);

        let outcome = gate.check(&clock, snapshot).await;
        assert!(matches!(outcome, DecisionOutcome::NoPrompt));
        assert_eq!(http.requests_to(EVALUATE).len(), 1);
        assert!(gate.last_decision_at().is_none());
    }

    #[tokio::test]
    async fn request_carries_behavioural_snapshot() {
        let (mut gate, http, clock) = gate();
        http.respond(EVALUATE, 200, r#"{"show": false}"#);

        gate.check(&clock, snapshot).await;
        let body = http.requests()[0].body.clone().unwrap();
        assert_eq!(body["session_id"], "s-1");
        assert_eq!(body["current_page"], "Product");
        assert_eq!(body["cart_items"], 1);
        assert_eq!(body["time_on_site"], 42);
    }

    #[tokio::test]
    async fn service_cooldown_governs_next_window() {
        let (mut gate, http, clock) = gate();
        http.respond(
            EVALUATE,
            200,
            r#"{"show": true, "message": "Free shipping today", "cooldownMs": 60000}"#,
        );
        http.respond(EVALUATE, 200, r#"{"show": false}"#);

        let shown = gate.check(&clock, snapshot).await;
        match shown {
            DecisionOutcome::Show(prompt) => assert_eq!(prompt.message, "Free shipping today"),
            other => panic!("expected prompt, got {other:?}"),
        }
        assert_eq!(gate.last_decision_at(), Some(at(0)));

        clock.set(at(30));
        let early = gate.check(&clock, snapshot).await;
        assert!(matches!(early, DecisionOutcome::CoolingDown { remaining_ms: 30_000 }));
        assert_eq!(http.requests_to(EVALUATE).len(), 1);

        clock.set(at(70));
        let later = gate.check(&clock, snapshot).await;
        assert!(matches!(later, DecisionOutcome::NoPrompt));
        assert_eq!(http.requests_to(EVALUATE).len(), 2);
    }

    #[tokio::test]
    async fn cooldown_starts_when_response_arrives() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let http = Arc::new(SlowClient {
            inner: ScriptedClient::new(),
            clock: clock.clone(),
            latency: Duration::seconds(4),
        });
        http.inner.respond(
            EVALUATE,
            200,
            r#"{"show": true, "message": "Hi", "cooldownMs": 60000}"#,
        );
        let mut gate = DecisionGate::new(EVALUATE, 180_000, http.clone());

        gate.check(clock.as_ref(), snapshot).await;
        assert_eq!(gate.last_decision_at(), Some(at(4)));

        clock.set(at(62));
        assert!(matches!(
            gate.check(clock.as_ref(), snapshot).await,
            DecisionOutcome::CoolingDown { remaining_ms: 2_000 }
        ));
    }

    #[tokio::test]
    async fn default_cooldown_when_service_omits_it() {
        let (mut gate, http, clock) = gate();
        http.respond(EVALUATE, 200, r#"{"show": true, "message": "Hello"}"#);

        gate.check(&clock, snapshot).await;
        assert_eq!(gate.cooldown(), Duration::milliseconds(180_000));
        clock.set(at(179));
        assert!(matches!(
            gate.check(&clock, snapshot).await,
            DecisionOutcome::CoolingDown { .. }
        ));
        // Boundary: exactly the cooldown has elapsed
        http.respond(EVALUATE, 200, r#"{"show": false}"#);
        clock.set(at(180));
        assert!(matches!(
            gate.check(&clock, snapshot).await,
            DecisionOutcome::NoPrompt
        ));
    }

    #[tokio::test]
    async fn failures_leave_state_unchanged() {
        let (mut gate, http, clock) = gate();
        http.respond(EVALUATE, 503, "");
        http.respond(EVALUATE, 200, "<html>oops</html>");
        http.fail(EVALUATE, "offline");

        for _ in 0..3 {
            assert!(matches!(
                gate.check(&clock, snapshot).await,
                DecisionOutcome::Failed(_)
            ));
        }
        assert!(gate.last_decision_at().is_none());
        assert_eq!(gate.cooldown(), Duration::milliseconds(180_000));
    }

    #[tokio::test]
    async fn snapshot_not_built_while_cooling_down() {
        let (mut gate, http, clock) = gate();
        http.respond(EVALUATE, 200, r#"{"show": true, "message": "Hi"}"#);
        gate.check(&clock, snapshot).await;

        clock.set(at(1));
        let outcome = gate
            .check(&clock, || panic!("snapshot built during cooldown"))
            .await;
        assert!(matches!(outcome, DecisionOutcome::CoolingDown { .. }));
    }
}
