//! Main engine loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::RwLock;
use tokio::runtime::{self, Runtime};
use tracing::{debug, info, instrument, warn};

use gostream_ipc::{DashboardSnapshot, EngineCommand, EngineEvent};

use crate::advisory::{dispatch, Advisor, AdvisoryReply, AdvisoryRequest};
use crate::coordinator::BroadcastCoordinator;
use crate::error::EngineError;
use crate::EngineResult;

/// Longest the loop sleeps without checking the clock.
const MAX_WAIT: Duration = Duration::from_millis(100);

/// Runs a [`BroadcastCoordinator`] against the wall clock.
///
/// Commands arrive on a channel; every change goes out as an
/// [`EngineEvent`] and into a shared [`DashboardSnapshot`]. Advisory calls run
/// on an owned tokio runtime and report back to the loop.
pub struct Engine {
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
    coordinator: BroadcastCoordinator,
    advisor: Arc<dyn Advisor>,
    runtime: Runtime,
    reply_tx: Sender<AdvisoryReply>,
    reply_rx: Receiver<AdvisoryReply>,
    snapshot: Arc<RwLock<DashboardSnapshot>>,
    started: Instant,
}

impl Engine {
    /// Create an engine around `coordinator`.
    pub fn new(
        coordinator: BroadcastCoordinator,
        advisor: Arc<dyn Advisor>,
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
    ) -> EngineResult<Self> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gostream-advisory")
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        let snapshot = Arc::new(RwLock::new(coordinator.snapshot()));

        Ok(Self {
            command_rx,
            event_tx,
            coordinator,
            advisor,
            runtime,
            reply_tx,
            reply_rx,
            snapshot,
            started: Instant::now(),
        })
    }

    /// Shared view of the latest dashboard state.
    pub fn snapshot_handle(&self) -> Arc<RwLock<DashboardSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!(advisor = self.advisor.name(), "Engine starting");
        self.started = Instant::now();
        self.send_event(EngineEvent::Ready);

        let commands = self.command_rx.clone();
        let replies = self.reply_rx.clone();

        loop {
            let timeout = self.wait_budget();
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => {
                        self.catch_up();
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Command channel disconnected, shutting down");
                        self.coordinator.shutdown();
                        self.flush();
                        break;
                    }
                },
                recv(replies) -> reply => {
                    if let Ok(reply) = reply {
                        self.coordinator.complete_advisory(reply);
                    }
                },
                default(timeout) => {}
            }

            self.catch_up();
            self.flush();
        }

        info!("Engine stopped");
    }

    /// Handle a command. Returns false if engine should stop.
    fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(?command, "Handling command");
        let name = command.name();

        let result = match command {
            EngineCommand::ToggleLive => self.coordinator.toggle_live(),
            EngineCommand::GoLive => self.coordinator.go_live(),
            EngineCommand::EndLive => {
                self.coordinator.end_live();
                Ok(())
            }
            EngineCommand::ToggleDestination { id } => self.coordinator.toggle_destination(&id),
            EngineCommand::LinkDestination { id } => self.coordinator.link_destination(&id),
            EngineCommand::UnlinkDestination { id } => self.coordinator.unlink_destination(&id),
            EngineCommand::SetTitle(title) => {
                self.coordinator.set_title(title);
                Ok(())
            }
            EngineCommand::ApplySuggestedTitle(index) => {
                self.coordinator.apply_suggested_title(index)
            }
            EngineCommand::RequestSuggestions => {
                let request = self.coordinator.request_suggestions();
                self.spawn_advisory(request);
                Ok(())
            }
            EngineCommand::AnalyzeMood => self
                .coordinator
                .request_mood()
                .map(|request| self.spawn_advisory(request)),
            EngineCommand::SelectSection(section) => {
                self.coordinator.select_section(section);
                Ok(())
            }
            EngineCommand::GetSnapshot => {
                let snapshot = self.coordinator.snapshot();
                self.send_event(EngineEvent::Snapshot(Box::new(snapshot)));
                Ok(())
            }
            EngineCommand::Shutdown => {
                self.coordinator.shutdown();
                self.flush();
                self.send_event(EngineEvent::Shutdown);
                return false;
            }
        };

        if let Err(e) = result {
            self.reject(name, e);
        }
        true
    }

    fn spawn_advisory(&self, request: AdvisoryRequest) {
        debug!(request = request.id(), "Dispatching advisory request");
        let advisor = Arc::clone(&self.advisor);
        let reply_tx = self.reply_tx.clone();

        self.runtime.spawn(async move {
            let reply = dispatch(advisor.as_ref(), request).await;
            if reply_tx.send(reply).is_err() {
                debug!("Engine gone, dropping advisory reply");
            }
        });
    }

    fn reject(&self, command: &str, error: EngineError) {
        if let EngineError::InsufficientData { have, need } = &error {
            debug!(command, have, need, "Not enough data, ignoring");
            return;
        }

        warn!(command, "Command rejected: {}", error);
        self.send_event(EngineEvent::Rejected {
            command: command.to_string(),
            message: error.to_string(),
        });
    }

    fn wait_budget(&self) -> Duration {
        self.coordinator
            .next_deadline()
            .map_or(MAX_WAIT, |deadline| {
                deadline.saturating_sub(self.started.elapsed())
            })
            .min(MAX_WAIT)
    }

    fn catch_up(&mut self) {
        self.coordinator.advance(self.started.elapsed());
    }

    fn flush(&mut self) {
        let events = self.coordinator.drain_events();
        if events.is_empty() {
            return;
        }

        *self.snapshot.write() = self.coordinator.snapshot();
        for event in events {
            self.send_event(event);
        }
    }

    fn send_event(&self, event: EngineEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::DisabledAdvisor;
    use crate::error::AdvisoryError;
    use crate::random::RngSource;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use gostream_ipc::{EngineConfig, MoodReport, Suggestions};
    use std::thread;

    const WAIT: Duration = Duration::from_secs(5);

    struct CannedAdvisor;

    #[async_trait]
    impl Advisor for CannedAdvisor {
        fn name(&self) -> &str {
            "canned"
        }

        async fn suggest(&self, topic: &str) -> Result<Suggestions, AdvisoryError> {
            Ok(Suggestions {
                titles: vec![format!("{topic}!"), "B".to_string(), "C".to_string()],
                tags: vec!["a".to_string(); 5],
                description: "canned".to_string(),
            })
        }

        async fn analyze_mood(&self, _messages: &[String]) -> Result<MoodReport, AdvisoryError> {
            Ok(MoodReport {
                mood: "chill".to_string(),
                summary: "calm chat".to_string(),
            })
        }
    }

    struct Harness {
        commands: Sender<EngineCommand>,
        events: Receiver<EngineEvent>,
        handle: thread::JoinHandle<()>,
    }

    impl Harness {
        fn start(advisor: Arc<dyn Advisor>) -> Self {
            let config = EngineConfig {
                metrics_tick: Duration::from_millis(20),
                chat_tick: Duration::from_millis(20),
                handshake_step: Duration::from_millis(10),
                ..Default::default()
            };
            let coordinator = BroadcastCoordinator::new(
                &config,
                Arc::new(MemoryStore::new()),
                Box::new(RngSource::seeded(1)),
            );
            let (commands, command_rx) = gostream_ipc::command_channel();
            let (event_tx, events) = gostream_ipc::event_channel();
            let mut engine = Engine::new(coordinator, advisor, command_rx, event_tx).unwrap();
            let handle = thread::spawn(move || engine.run());
            Self {
                commands,
                events,
                handle,
            }
        }

        fn send(&self, command: EngineCommand) {
            self.commands.send(command).unwrap();
        }

        fn wait_for(&self, mut accept: impl FnMut(&EngineEvent) -> bool) -> EngineEvent {
            let deadline = Instant::now() + WAIT;
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                let event = self.events.recv_timeout(left).expect("event not received");
                if accept(&event) {
                    return event;
                }
            }
        }

        fn stop(self) {
            self.send(EngineCommand::Shutdown);
            self.wait_for(|e| matches!(e, EngineEvent::Shutdown));
            self.handle.join().unwrap();
        }
    }

    #[test]
    fn test_engine_goes_live_and_ticks() {
        let h = Harness::start(Arc::new(DisabledAdvisor));
        h.wait_for(|e| matches!(e, EngineEvent::Ready));

        h.send(EngineCommand::GoLive);
        h.wait_for(|e| matches!(e, EngineEvent::SessionChanged(s) if s.is_live));

        let EngineEvent::Metrics(sample) = h.wait_for(|e| matches!(e, EngineEvent::Metrics(_)))
        else {
            unreachable!();
        };
        assert!(sample.viewers >= 10);
        h.wait_for(|e| matches!(e, EngineEvent::Chat(_)));

        h.stop();
    }

    #[test]
    fn test_engine_rejects_unknown_destination() {
        let h = Harness::start(Arc::new(DisabledAdvisor));

        h.send(EngineCommand::ToggleDestination {
            id: "myspace".to_string(),
        });

        let event = h.wait_for(|e| matches!(e, EngineEvent::Rejected { .. }));
        let EngineEvent::Rejected { command, .. } = event else {
            unreachable!();
        };
        assert_eq!(command, "toggle_destination");

        h.stop();
    }

    #[test]
    fn test_engine_links_destination() {
        let h = Harness::start(Arc::new(DisabledAdvisor));

        h.send(EngineCommand::LinkDestination {
            id: "kick".to_string(),
        });

        let event = h.wait_for(|e| matches!(e, EngineEvent::PlatformsChanged(_)));
        let EngineEvent::PlatformsChanged(platforms) = event else {
            unreachable!();
        };
        let kick = platforms.iter().find(|p| p.id == "kick").unwrap();
        assert!(kick.connected && kick.active);

        h.stop();
    }

    #[test]
    fn test_engine_delivers_suggestions() {
        let h = Harness::start(Arc::new(CannedAdvisor));

        h.send(EngineCommand::SetTitle("Retro night".to_string()));
        h.send(EngineCommand::RequestSuggestions);

        let event = h.wait_for(|e| matches!(e, EngineEvent::Suggestions(_)));
        let EngineEvent::Suggestions(suggestions) = event else {
            unreachable!();
        };
        assert_eq!(suggestions.titles[0], "Retro night!");

        h.send(EngineCommand::ApplySuggestedTitle(0));
        h.wait_for(|e| matches!(e, EngineEvent::SessionChanged(s) if s.title == "Retro night!"));

        h.stop();
    }

    #[test]
    fn test_disabled_advisor_sends_nothing_back() {
        let h = Harness::start(Arc::new(DisabledAdvisor));

        h.send(EngineCommand::RequestSuggestions);
        h.send(EngineCommand::GetSnapshot);

        let event = h.wait_for(|e| {
            matches!(e, EngineEvent::Snapshot(_) | EngineEvent::Suggestions(_))
        });
        let EngineEvent::Snapshot(snapshot) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert!(snapshot.suggestions.is_none());

        h.stop();
    }

    #[test]
    fn test_mood_on_short_feed_is_silent() {
        let h = Harness::start(Arc::new(CannedAdvisor));
        h.wait_for(|e| matches!(e, EngineEvent::Ready));

        h.send(EngineCommand::AnalyzeMood);
        h.send(EngineCommand::GetSnapshot);

        let event = h.wait_for(|e| {
            matches!(
                e,
                EngineEvent::Snapshot(_) | EngineEvent::Rejected { .. } | EngineEvent::Mood(_)
            )
        });
        let EngineEvent::Snapshot(snapshot) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert!(snapshot.chat.is_empty());
        assert!(snapshot.mood.is_none());

        h.stop();
    }

    #[test]
    fn test_engine_stops_when_commands_disconnect() {
        let h = Harness::start(Arc::new(DisabledAdvisor));
        h.wait_for(|e| matches!(e, EngineEvent::Ready));

        drop(h.commands);

        h.handle.join().unwrap();
    }
}
