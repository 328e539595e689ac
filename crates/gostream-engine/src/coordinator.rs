//! Broadcast session coordinator.
//!
//! Owns the platform registry, the linking flow, both periodic engines and
//! the session itself. Every timed behavior runs on the coordinator's
//! [`Scheduler`]; the owner drives time with [`BroadcastCoordinator::advance`].
//! Changes are queued as [`EngineEvent`]s and collected with
//! [`BroadcastCoordinator::drain_events`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use gostream_ipc::{
    default_catalog, BroadcastSession, ChatMessage, ConnectionPhase, ConnectionProgress,
    DashboardSection, DashboardSnapshot, EngineConfig, EngineEvent, LiveMetricsSample,
    MoodReport, Platform, Suggestions, DEFAULT_TITLE,
};

use crate::advisory::{AdvisoryKind, AdvisoryReply, AdvisoryRequest, AdvisoryTracker};
use crate::chat::ChatAggregator;
use crate::connection::{AttemptId, ConnectionFlow, FlowAdvance};
use crate::error::EngineError;
use crate::metrics::{MetricsConfig, SessionMetricsEngine};
use crate::random::RandomSource;
use crate::registry::PlatformRegistry;
use crate::scheduler::{Scheduler, TimerId};
use crate::store::{load_json, save_json, KeyValueStore, PLATFORMS_KEY, TITLE_KEY};
use crate::EngineResult;

/// Work the coordinator schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    MetricsTick,
    ChatTick,
    ConnectionStep(AttemptId),
}

/// Top-level orchestrator for one dashboard session.
pub struct BroadcastCoordinator {
    registry: PlatformRegistry,
    flow: ConnectionFlow,
    metrics: SessionMetricsEngine,
    chat: ChatAggregator,
    session: BroadcastSession,
    section: DashboardSection,
    scheduler: Scheduler<Timer>,
    metrics_timer: Option<TimerId>,
    chat_timer: Option<TimerId>,
    chat_tick: Duration,
    handshake_step: Duration,
    advisory: AdvisoryTracker,
    suggestions: Option<Suggestions>,
    mood: Option<MoodReport>,
    rng: Box<dyn RandomSource>,
    store: Arc<dyn KeyValueStore>,
    events: Vec<EngineEvent>,
}

impl BroadcastCoordinator {
    /// Create a coordinator, restoring platforms and title from `store`.
    ///
    /// Missing or unreadable records fall back to the default catalog and
    /// title.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn KeyValueStore>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let platforms = match load_json::<Vec<Platform>>(store.as_ref(), PLATFORMS_KEY) {
            Ok(Some(platforms)) if !platforms.is_empty() => platforms,
            Ok(_) => default_catalog(),
            Err(e) => {
                warn!("Failed to restore platforms, using defaults: {}", e);
                default_catalog()
            }
        };

        let title = match load_json::<String>(store.as_ref(), TITLE_KEY) {
            Ok(Some(title)) => title,
            Ok(None) => DEFAULT_TITLE.to_string(),
            Err(e) => {
                warn!("Failed to restore title, using default: {}", e);
                DEFAULT_TITLE.to_string()
            }
        };

        let metrics = SessionMetricsEngine::new(MetricsConfig {
            tick_interval: config.metrics_tick,
            history_len: config.metrics_history,
            ..Default::default()
        });

        Self {
            registry: PlatformRegistry::new(platforms),
            flow: ConnectionFlow::new(),
            metrics,
            chat: ChatAggregator::new(config.chat_capacity),
            session: BroadcastSession {
                is_live: false,
                title,
            },
            section: DashboardSection::default(),
            scheduler: Scheduler::new(),
            metrics_timer: None,
            chat_timer: None,
            chat_tick: config.chat_tick,
            handshake_step: config.handshake_step,
            advisory: AdvisoryTracker::new(),
            suggestions: None,
            mood: None,
            rng,
            store,
            events: Vec::new(),
        }
    }

    // --- Reads ---

    /// Destinations in catalog order.
    pub fn platforms(&self) -> &[Platform] {
        self.registry.list()
    }

    /// Look up one destination.
    pub fn platform(&self, id: &str) -> EngineResult<&Platform> {
        self.registry.get(id)
    }

    /// Liveness and title.
    pub fn session(&self) -> &BroadcastSession {
        &self.session
    }

    /// Returns true while on air.
    pub fn is_live(&self) -> bool {
        self.session.is_live
    }

    /// Latest metrics sample, or the idle baseline.
    pub fn metrics(&self) -> LiveMetricsSample {
        self.metrics.current()
    }

    /// Chat feed, oldest first.
    pub fn chat(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.messages()
    }

    /// Phase of the linking flow.
    pub fn connection_phase(&self) -> ConnectionPhase {
        self.flow.phase()
    }

    /// Handshake in flight, if any.
    pub fn connection_progress(&self) -> Option<ConnectionProgress> {
        self.flow.progress()
    }

    /// Visible dashboard section.
    pub fn section(&self) -> DashboardSection {
        self.section
    }

    /// Last accepted suggestions.
    pub fn suggestions(&self) -> Option<&Suggestions> {
        self.suggestions.as_ref()
    }

    /// Last accepted mood report.
    pub fn mood(&self) -> Option<&MoodReport> {
        self.mood.as_ref()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// When the next timer is due.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Everything the dashboard shows.
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            platforms: self.registry.list().to_vec(),
            session: self.session.clone(),
            metrics: self.metrics.current(),
            history: self.metrics.history().copied().collect(),
            chat: self.chat.messages().cloned().collect(),
            connection: self.flow.progress(),
            suggestions: self.suggestions.clone(),
            mood: self.mood.clone(),
            section: self.section,
        }
    }

    /// Take the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Session ---

    /// Go live if idle, end the session if live.
    pub fn toggle_live(&mut self) -> EngineResult<()> {
        if self.session.is_live {
            self.end_live();
            Ok(())
        } else {
            self.go_live()
        }
    }

    /// Start the broadcast. Needs at least one active, connected destination.
    #[instrument(name = "go_live", skip(self))]
    pub fn go_live(&mut self) -> EngineResult<()> {
        if self.session.is_live {
            debug!("Already live, ignoring");
            return Ok(());
        }

        let active = self.registry.active_count();
        if active == 0 {
            return Err(EngineError::NoActiveDestination);
        }

        self.chat.clear();
        self.metrics.reset();
        self.session.is_live = true;

        let metrics_tick = self.metrics.tick_interval();
        self.metrics_timer = Some(self.scheduler.schedule_after(metrics_tick, Timer::MetricsTick));
        self.chat_timer = Some(self.scheduler.schedule_after(self.chat_tick, Timer::ChatTick));

        info!(destinations = active, title = %self.session.title, "Session is live");
        self.emit(EngineEvent::SessionChanged(self.session.clone()));
        Ok(())
    }

    /// End the broadcast. Always succeeds.
    ///
    /// Pending ticks are cancelled, metrics return to baseline and the chat
    /// feed is cleared.
    #[instrument(name = "end_live", skip(self))]
    pub fn end_live(&mut self) {
        if !self.session.is_live {
            debug!("Already idle, ignoring");
            return;
        }

        for timer in [self.metrics_timer.take(), self.chat_timer.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(timer);
        }

        self.session.is_live = false;
        self.metrics.reset();
        self.chat.clear();

        info!("Session ended");
        self.emit(EngineEvent::SessionChanged(self.session.clone()));
        self.emit(EngineEvent::Metrics(self.metrics.current()));
    }

    /// Replace the stream title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.session.title = title.into();
        debug!(title = %self.session.title, "Title changed");
        self.persist_title();
        self.emit(EngineEvent::SessionChanged(self.session.clone()));
    }

    /// Use one of the most recently suggested titles.
    pub fn apply_suggested_title(&mut self, index: usize) -> EngineResult<()> {
        let title = self
            .suggestions
            .as_ref()
            .and_then(|s| s.titles.get(index))
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidState(format!("No suggested title at position {index}"))
            })?;
        self.set_title(title);
        Ok(())
    }

    /// Switch the visible dashboard section.
    pub fn select_section(&mut self, section: DashboardSection) {
        if self.section != section {
            self.section = section;
            self.emit(EngineEvent::SectionChanged(section));
        }
    }

    // --- Destinations ---

    /// Flip a connected destination, or start linking a disconnected one.
    ///
    /// Turning off the last active destination while live is allowed: the
    /// session stays on air and the engines idle until one is re-enabled.
    #[instrument(name = "toggle_destination", skip(self))]
    pub fn toggle_destination(&mut self, id: &str) -> EngineResult<()> {
        if !self.registry.get(id)?.connected {
            return self.link_destination(id);
        }

        let active = self.registry.toggle_active(id)?;
        info!(platform = id, active, "Destination toggled");
        if self.session.is_live && self.registry.active_count() == 0 {
            info!("No active destinations, live session on standby");
        }
        self.platforms_changed();
        Ok(())
    }

    /// Start the linking handshake for a disconnected destination.
    #[instrument(name = "link_destination", skip(self))]
    pub fn link_destination(&mut self, id: &str) -> EngineResult<()> {
        let attempt = self.flow.start(self.registry.get(id)?)?;
        self.scheduler
            .schedule_after(self.handshake_step, Timer::ConnectionStep(attempt));
        self.emit(EngineEvent::ConnectionProgress {
            platform_id: id.to_string(),
            phase: self.flow.phase(),
        });
        Ok(())
    }

    /// Drop the link to a destination; it is deactivated as well.
    #[instrument(name = "unlink_destination", skip(self))]
    pub fn unlink_destination(&mut self, id: &str) -> EngineResult<()> {
        let platform = self.registry.get(id)?;
        if !platform.connected {
            return Err(EngineError::InvalidState(format!(
                "{} is not connected",
                platform.name
            )));
        }

        self.registry.set_connected(id, false)?;
        info!(platform = id, "Destination unlinked");
        self.platforms_changed();
        Ok(())
    }

    // --- Advisory ---

    /// Prepare a suggestion request for the current title.
    ///
    /// Any earlier suggestion request still in flight is superseded.
    pub fn request_suggestions(&mut self) -> AdvisoryRequest {
        let id = self.advisory.issue(AdvisoryKind::Suggest);
        AdvisoryRequest::Suggest {
            id,
            topic: self.session.title.clone(),
        }
    }

    /// Prepare a mood request for the latest chat.
    ///
    /// Fails with `InsufficientData` until enough chat has arrived.
    pub fn request_mood(&mut self) -> EngineResult<AdvisoryRequest> {
        let messages = self.chat.mood_sample()?;
        let id = self.advisory.issue(AdvisoryKind::Mood);
        Ok(AdvisoryRequest::Mood { id, messages })
    }

    /// Apply an advisory reply.
    ///
    /// Replies for superseded requests are dropped. Failures keep the
    /// previous suggestion or mood.
    pub fn complete_advisory(&mut self, reply: AdvisoryReply) {
        match reply {
            AdvisoryReply::Suggestions { id, result } => {
                if !self.advisory.accept(AdvisoryKind::Suggest, id) {
                    debug!(request = id, "Dropping superseded suggestions");
                    return;
                }
                match result {
                    Ok(suggestions) => {
                        self.suggestions = Some(suggestions.clone());
                        self.emit(EngineEvent::Suggestions(suggestions));
                    }
                    Err(e) => warn!("Suggestions unavailable, keeping previous: {}", e),
                }
            }
            AdvisoryReply::Mood { id, result } => {
                if !self.advisory.accept(AdvisoryKind::Mood, id) {
                    debug!(request = id, "Dropping superseded mood report");
                    return;
                }
                match result {
                    Ok(mood) => {
                        self.mood = Some(mood.clone());
                        self.emit(EngineEvent::Mood(mood));
                    }
                    Err(e) => warn!("Mood analysis unavailable, keeping previous: {}", e),
                }
            }
        }
    }

    // --- Time ---

    /// Run every timer due up to `until`, in deadline order.
    pub fn advance(&mut self, until: Duration) {
        while let Some((_, timer)) = self.scheduler.pop_due(until) {
            self.fire(timer);
        }
        self.scheduler.settle(until);
    }

    /// Run every timer due within `delta` of the current time.
    pub fn advance_by(&mut self, delta: Duration) {
        self.advance(self.scheduler.now() + delta);
    }

    /// Tear the session down: end it and discard every pending timer.
    ///
    /// A handshake in flight is abandoned without committing.
    pub fn shutdown(&mut self) {
        self.end_live();
        if let Some(attempt) = self.flow.current() {
            warn!(platform = %attempt.platform_id, "Abandoning connection flow");
        }
        let discarded = self.scheduler.cancel_all();
        debug!(discarded, "Coordinator shut down");
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::MetricsTick => self.on_metrics_tick(),
            Timer::ChatTick => self.on_chat_tick(),
            Timer::ConnectionStep(attempt) => self.on_connection_step(attempt),
        }
    }

    fn on_metrics_tick(&mut self) {
        if !self.session.is_live {
            return;
        }
        let interval = self.metrics.tick_interval();
        self.metrics_timer = Some(self.scheduler.schedule_after(interval, Timer::MetricsTick));

        if let Some(sample) = self.metrics.tick(self.registry.active_count(), &mut self.rng) {
            self.emit(EngineEvent::Metrics(sample));
        }
    }

    fn on_chat_tick(&mut self) {
        if !self.session.is_live {
            return;
        }
        self.chat_timer = Some(self.scheduler.schedule_after(self.chat_tick, Timer::ChatTick));

        let message = {
            let sources: Vec<&Platform> = self.registry.broadcasting().collect();
            self.chat.tick(&sources, &mut self.rng)
        };
        if let Some(message) = message {
            self.emit(EngineEvent::Chat(message));
        }
    }

    fn on_connection_step(&mut self, attempt: AttemptId) {
        match self.flow.advance(attempt) {
            FlowAdvance::Stepped(phase) => {
                self.scheduler
                    .schedule_after(self.handshake_step, Timer::ConnectionStep(attempt));
                if let Some(progress) = self.flow.progress() {
                    self.emit(EngineEvent::ConnectionProgress {
                        platform_id: progress.platform_id,
                        phase,
                    });
                }
            }
            FlowAdvance::Completed { platform_id } => {
                let committed = self
                    .registry
                    .set_connected(&platform_id, true)
                    .and_then(|()| self.registry.set_active(&platform_id, true));
                if let Err(e) = committed {
                    warn!(platform = %platform_id, "Failed to commit connection: {}", e);
                    return;
                }

                info!(platform = %platform_id, "Destination linked");
                self.emit(EngineEvent::ConnectionProgress {
                    platform_id,
                    phase: ConnectionPhase::Done,
                });
                self.platforms_changed();
            }
            FlowAdvance::Stale => {}
        }
    }

    // --- Persistence & events ---

    fn platforms_changed(&mut self) {
        self.persist_platforms();
        self.emit(EngineEvent::PlatformsChanged(self.registry.list().to_vec()));
    }

    fn persist_platforms(&self) {
        if let Err(e) = save_json(self.store.as_ref(), PLATFORMS_KEY, self.registry.list()) {
            warn!("Failed to persist platforms: {}", e);
        }
    }

    fn persist_title(&self) {
        if let Err(e) = save_json(self.store.as_ref(), TITLE_KEY, &self.session.title) {
            warn!("Failed to persist title: {}", e);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}
