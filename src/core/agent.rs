//! The agent: one context object owning every pipeline component.
//!
//! Host signals and timers are handled one at a time on a single task, so
//! a state mutation and its persistence are never interleaved with another
//! handler. Network calls are the only await points.

use crate::config::Config;
use crate::core::capture::{ClickAction, ClickClassifier, ClickTarget, EventBuffer, ThemeClassifier};
use crate::core::cart::CartObserver;
use crate::core::clock::{Clock, SystemClock};
use crate::core::decision::{DecisionGate, DecisionOutcome, DecisionReason, DecisionRequest};
use crate::core::navigation::{NavigationHub, NavigationSignal, NavigationSource};
use crate::core::page::Location;
use crate::core::schedule::{Schedule, Task};
use crate::core::session::SessionModel;
use crate::core::state::{Event, SessionRecord, event_type};
use crate::core::transport::{FlushOutcome, FlushReason, Transport};
use crate::core::visibility::{Accrual, Visibility, VisibilityClock};
use crate::error::Error;
use crate::host::{HistoryKind, HostSignal, JsonLinePresenter, Presenter, VisibilityState};
use crate::http::HttpClient;
use crate::storage::StateStore;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How long the run loop sleeps when nothing is scheduled.
const IDLE_WAIT: std::time::Duration = std::time::Duration::from_secs(60);

/// Collaborators the agent is built from.
pub struct AgentDeps {
    /// Persisted record backend.
    pub store: Arc<dyn StateStore>,
    /// Network seam.
    pub http: Arc<dyn HttpClient>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Prompt renderer.
    pub presenter: Arc<dyn Presenter>,
    /// Click labeller.
    pub classifier: Arc<dyn ClickClassifier>,
}

impl AgentDeps {
    /// System clock, JSON-line presenter and theme classifier.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            store,
            http,
            clock: Arc::new(SystemClock),
            presenter: Arc::new(JsonLinePresenter),
            classifier: Arc::new(ThemeClassifier),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the presenter.
    #[must_use]
    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// Replace the click classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ClickClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Storefront telemetry agent.
pub struct Agent {
    config: Config,
    clock: Arc<dyn Clock>,
    presenter: Arc<dyn Presenter>,
    classifier: Arc<dyn ClickClassifier>,
    model: SessionModel,
    buffer: EventBuffer,
    navigation: NavigationHub,
    visibility: VisibilityClock,
    cart: CartObserver,
    transport: Transport,
    gate: DecisionGate,
    schedule: Schedule,
    started_at: DateTime<Utc>,
    /// Visible time since this agent booted. Flushes never reset it.
    time_on_site_ms: u64,
    booted: bool,
}

impl Agent {
    /// Wire up every component. Timers start on the first load.
    #[must_use]
    pub fn new(config: Config, deps: AgentDeps) -> Self {
        let now = deps.clock.now();
        let initial = Location::from_href("/");

        Self {
            model: SessionModel::new(deps.store),
            buffer: EventBuffer::new(&config.agent.user_agent),
            visibility: VisibilityClock::new(initial.page_key(), now),
            navigation: NavigationHub::new(initial, config.navigation.dedupe_window_ms),
            cart: CartObserver::new(&config.cart.url, deps.http.clone()),
            transport: Transport::new(
                &config.collector.endpoint(),
                config.collector.clear_after_send,
                deps.http.clone(),
            ),
            gate: DecisionGate::new(
                &config.decision.endpoint(),
                config.decision.default_cooldown_ms,
                deps.http,
            ),
            clock: deps.clock,
            presenter: deps.presenter,
            classifier: deps.classifier,
            schedule: Schedule::new(),
            started_at: now,
            time_on_site_ms: 0,
            booted: false,
            config,
        }
    }

    /// Current persisted record (repaired if needed).
    pub fn record(&mut self) -> SessionRecord {
        self.model.ensure()
    }

    /// Where the page currently is.
    #[must_use]
    pub fn location(&self) -> &Location {
        self.navigation.current()
    }

    /// Decision gate state.
    #[must_use]
    pub fn gate(&self) -> &DecisionGate {
        &self.gate
    }

    /// Pending timers.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Visible time accrued since boot.
    #[must_use]
    pub fn time_on_site_ms(&self) -> u64 {
        self.time_on_site_ms
    }

    /// Whether persistence is currently failing.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.model.is_degraded()
    }

    /// Handle one host signal.
    ///
    /// Until the first `load`, every other signal except `unload` is dropped.
    pub async fn handle(&mut self, signal: HostSignal) {
        if !self.booted && !matches!(signal, HostSignal::Load { .. } | HostSignal::Unload) {
            debug!(?signal, "ignoring signal before load");
            return;
        }
        match signal {
            HostSignal::Load { href } => {
                if self.booted {
                    self.navigate(NavigationSource::Load, &href).await;
                } else {
                    self.boot(&href).await;
                }
            }
            HostSignal::Click { target } => {
                self.click(&target).await;
            }
            HostSignal::History { kind, href } => {
                let source = match kind {
                    HistoryKind::Push => NavigationSource::PushState,
                    HistoryKind::Replace => NavigationSource::ReplaceState,
                };
                self.navigate(source, &href).await;
            }
            HostSignal::Popstate { href } => {
                self.navigate(NavigationSource::PopState, &href).await;
            }
            HostSignal::Hashchange { href } => {
                self.navigate(NavigationSource::HashChange, &href).await;
            }
            HostSignal::Visibility { state } => self.visibility_changed(state).await,
            HostSignal::CartChanged => {
                self.refresh_cart().await;
            }
            HostSignal::PromptAction { action } => self.prompt_action(&action).await,
            HostSignal::Unload => {
                self.unload().await;
            }
        }
    }

    /// First load: session start, page view, cart sync, timers, delayed
    /// decision. Visible time starts counting here.
    pub async fn boot(&mut self, href: &str) {
        let now = self.clock.now();
        self.booted = true;
        self.started_at = now;
        self.navigation
            .observe(NavigationSource::Load, Location::from_href(href), now);
        let page = self.location().page_key();
        self.visibility.restart(page.clone(), now);
        info!(%page, "agent booted");

        self.schedule
            .every(Task::Heartbeat, millis(self.config.visibility.heartbeat_ms), now);
        self.schedule
            .every(Task::Flush, millis(self.config.flush.interval_ms), now);
        self.schedule
            .every(Task::Decision, millis(self.config.decision.interval_ms), now);

        self.capture(event_type::SESSION_START, Map::new()).await;
        self.capture(event_type::PAGE_VIEW, Map::new()).await;
        self.refresh_cart().await;
        self.schedule.once(
            Task::BootDecision,
            now + millis(self.config.decision.boot_delay_ms),
        );
    }

    /// Record an event on the current page, flushing if the buffer is full.
    pub async fn capture(&mut self, kind: &str, fields: Map<String, Value>) -> Event {
        let now = self.clock.now();
        let session_id = self.model.ensure().session_id;
        let location = self.navigation.current().clone();
        let event = self
            .buffer
            .stamp(&session_id, &location, kind, fields, now);
        let stored = self.model.record_event(&location.page_key(), event);

        if self.model.total_event_count() >= self.config.flush.threshold {
            self.flush(FlushReason::Threshold).await;
        }
        stored
    }

    /// Classify and record a click. Add-to-cart schedules a cart refresh.
    pub async fn click(&mut self, target: &ClickTarget) -> Option<ClickAction> {
        let action = self.classifier.classify(target)?;
        self.capture(event_type::CLICK, object(json!({ "action": action.as_str() })))
            .await;
        if action == ClickAction::AddToCart {
            let at = self.clock.now() + millis(self.config.cart.refresh_delay_ms);
            self.schedule.once(Task::CartRefresh, at);
        }
        Some(action)
    }

    /// Report a location change from any navigation source.
    pub async fn navigate(
        &mut self,
        source: NavigationSource,
        href: &str,
    ) -> Option<NavigationSignal> {
        let now = self.clock.now();
        let signal = self
            .navigation
            .observe(source, Location::from_href(href), now)?;
        debug!(?source, page = %signal.location.page_key(), "navigation");

        let accrual = self.visibility.switch_page(signal.location.page_key(), now);
        self.apply(accrual);
        self.capture(event_type::PAGE_VIEW, Map::new()).await;
        self.refresh_cart().await;
        Some(signal)
    }

    /// Host reported a visibility change.
    pub async fn visibility_changed(&mut self, state: VisibilityState) {
        let (to, label) = match state {
            VisibilityState::Visible => (Visibility::Visible, "visible"),
            VisibilityState::Hidden => (Visibility::Hidden, "hidden"),
        };
        let accrual = self.visibility.transition(to, self.clock.now());
        self.apply(accrual);
        self.capture(event_type::VISIBILITY, object(json!({ "state": label })))
            .await;
    }

    /// Reconcile the cart count.
    pub async fn refresh_cart(&mut self) -> Option<u64> {
        self.cart.refresh(&mut self.model).await
    }

    /// Send the current record to the collector.
    pub async fn flush(&mut self, reason: FlushReason) -> FlushOutcome {
        let now = self.clock.now();
        self.transport.flush(reason, &mut self.model, now).await
    }

    /// Ask the decision service whether to show a prompt.
    pub async fn evaluate(&mut self, reason: DecisionReason) -> DecisionOutcome {
        let now = self.clock.now();
        let started_at = self.started_at.timestamp();
        let location = self.navigation.current().clone();
        let model = &mut self.model;
        let visibility = &mut self.visibility;
        let time_on_site_ms = &mut self.time_on_site_ms;

        let outcome = self
            .gate
            .check(self.clock.as_ref(), || {
                if let Some(Accrual { page, delta_ms }) = visibility.tick(now) {
                    model.accumulate_time(&page, delta_ms);
                    *time_on_site_ms += delta_ms;
                }
                let record = model.ensure();
                DecisionRequest {
                    session_id: record.session_id,
                    current_page: location.category(),
                    url: location.href,
                    cart_items: record.items_in_cart,
                    time_on_site: *time_on_site_ms / 1_000,
                    started_at,
                }
            })
            .await;

        if let DecisionOutcome::Show(prompt) = &outcome {
            self.presenter.present(prompt);
            let mut fields = object(json!({
                "reason": reason.to_string(),
                "message_len": prompt.message.chars().count(),
            }));
            if let Some(category) = &prompt.category {
                fields.insert("category".to_string(), json!(category));
            }
            self.capture(event_type::PROMPT_SHOWN, fields).await;
            self.flush(FlushReason::PromptShown).await;
        }
        outcome
    }

    /// Shopper answered the prompt.
    pub async fn prompt_action(&mut self, action: &str) {
        self.capture(event_type::PROMPT_ACTION, object(json!({ "action": action })))
            .await;
        self.flush(FlushReason::PromptAction).await;
    }

    /// Final best-effort flush before the page goes away.
    pub async fn unload(&mut self) -> FlushOutcome {
        if !self.booted {
            return FlushOutcome::Skipped;
        }
        let accrual = self.visibility.tick(self.clock.now());
        self.apply(accrual);
        self.capture(event_type::UNLOAD, Map::new()).await;

        let grace = std::time::Duration::from_millis(self.config.flush.unload_grace_ms);
        match tokio::time::timeout(grace, self.flush(FlushReason::Unload)).await {
            Ok(outcome) => outcome,
            Err(_) => FlushOutcome::Failed(Error::Http("unload flush timed out".to_string())),
        }
    }

    /// Run whatever timers are due. Returns the tasks that ran.
    pub async fn tick(&mut self) -> Vec<Task> {
        let due = self.schedule.take_due(self.clock.now());
        for task in &due {
            match task {
                Task::Heartbeat => {
                    let accrual = self.visibility.tick(self.clock.now());
                    self.apply(accrual);
                }
                Task::Flush => {
                    self.flush(FlushReason::Timer).await;
                }
                Task::Decision => {
                    self.evaluate(DecisionReason::Interval).await;
                }
                Task::BootDecision => {
                    self.evaluate(DecisionReason::Boot).await;
                }
                Task::CartRefresh => {
                    self.refresh_cart().await;
                }
            }
        }
        due
    }

    /// Drive the agent from a signal channel until unload or channel close.
    pub async fn run(mut self, mut signals: mpsc::Receiver<HostSignal>) {
        loop {
            let wait = self.schedule.next_due().map_or(IDLE_WAIT, |at| {
                (at - self.clock.now()).to_std().unwrap_or_default()
            });
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(HostSignal::Unload) | None => {
                        let outcome = self.unload().await;
                        debug!(sent = outcome.is_ok(), "agent stopped");
                        break;
                    }
                    Some(signal) => self.handle(signal).await,
                },
                () = tokio::time::sleep(wait) => {
                    self.tick().await;
                }
            }
        }
    }

    fn apply(&mut self, accrual: Option<Accrual>) {
        if let Some(Accrual { page, delta_ms }) = accrual {
            self.model.accumulate_time(&page, delta_ms);
            self.time_on_site_ms += delta_ms;
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
