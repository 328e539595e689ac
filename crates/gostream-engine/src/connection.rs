//! Simulated destination-linking handshake.
//!
//! A flow walks `Handshake -> TokenSwap -> Finalizing -> Done`, one phase per
//! scheduled step. Only the owner commits the result to the registry, and only
//! when [`ConnectionFlow::advance`] reports [`FlowAdvance::Completed`]. If the
//! host process stops before that, the platform stays unconnected: the commit
//! happens at most once and never partially.

use tracing::{debug, info};

use gostream_ipc::{ConnectionPhase, ConnectionProgress, Platform};

use crate::error::EngineError;
use crate::EngineResult;

/// Identifies one run of the flow. Timers carry it so a step scheduled for an
/// earlier attempt can be recognized and ignored.
pub type AttemptId = u64;

/// The handshake in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAttempt {
    /// Attempt number.
    pub id: AttemptId,

    /// Platform being linked.
    pub platform_id: String,

    /// Display name of that platform.
    pub platform_name: String,

    /// Current phase. Never `Idle`.
    pub phase: ConnectionPhase,
}

/// Outcome of one scheduled step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAdvance {
    /// Moved to an intermediate phase; schedule another step.
    Stepped(ConnectionPhase),

    /// Reached `Done`; the caller must mark the platform connected and active.
    /// The flow is already back to idle.
    Completed { platform_id: String },

    /// The step belonged to an attempt that is no longer in flight.
    Stale,
}

/// At most one handshake system-wide.
#[derive(Debug, Default)]
pub struct ConnectionFlow {
    current: Option<ConnectionAttempt>,
    next_attempt: AttemptId,
}

impl ConnectionFlow {
    /// Create an idle flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase (`Idle` when nothing is in flight).
    pub fn phase(&self) -> ConnectionPhase {
        self.current
            .as_ref()
            .map_or(ConnectionPhase::Idle, |attempt| attempt.phase)
    }

    #[cfg(test)]
    fn step(&self) -> u8 {
        self.phase().step()
    }

    /// The handshake in flight.
    pub fn current(&self) -> Option<&ConnectionAttempt> {
        self.current.as_ref()
    }

    /// Host-facing view of the handshake in flight.
    pub fn progress(&self) -> Option<ConnectionProgress> {
        self.current.as_ref().map(|attempt| ConnectionProgress {
            platform_id: attempt.platform_id.clone(),
            platform_name: attempt.platform_name.clone(),
            phase: attempt.phase,
        })
    }

    /// Begin linking `platform`. Moves straight to `Handshake`.
    ///
    /// Fails with `Conflict` while another attempt is in flight and with
    /// `InvalidState` if the platform is already connected.
    pub fn start(&mut self, platform: &Platform) -> EngineResult<AttemptId> {
        if let Some(attempt) = &self.current {
            return Err(EngineError::Conflict(attempt.platform_name.clone()));
        }
        if platform.connected {
            return Err(EngineError::InvalidState(format!(
                "{} is already connected",
                platform.name
            )));
        }

        let id = self.next_attempt;
        self.next_attempt += 1;

        self.current = Some(ConnectionAttempt {
            id,
            platform_id: platform.id.clone(),
            platform_name: platform.name.clone(),
            phase: ConnectionPhase::Handshake,
        });

        info!(platform = %platform.id, attempt = id, "Connection flow started");
        Ok(id)
    }

    /// Run the next step of attempt `id`.
    pub fn advance(&mut self, id: AttemptId) -> FlowAdvance {
        let Some(attempt) = self.current.as_mut().filter(|a| a.id == id) else {
            debug!(attempt = id, "Ignoring step for stale connection attempt");
            return FlowAdvance::Stale;
        };

        match attempt.phase.next() {
            Some(ConnectionPhase::Done) | None => {
                let platform_id = attempt.platform_id.clone();
                self.current = None;
                info!(platform = %platform_id, attempt = id, "Connection flow completed");
                FlowAdvance::Completed { platform_id }
            }
            Some(phase) => {
                attempt.phase = phase;
                debug!(
                    platform = %attempt.platform_id,
                    phase = phase.name(),
                    "Connection flow step"
                );
                FlowAdvance::Stepped(phase)
            }
        }
    }
}
