//! Events sent from the engine to the host.

use serde::{Deserialize, Serialize};

use crate::state::{ConnectionPhase, DashboardSection};
use crate::types::{
    BroadcastSession, ChatMessage, DashboardSnapshot, LiveMetricsSample, MoodReport, Platform,
    Suggestions,
};

/// Events that the engine can send to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine is ready.
    Ready,

    /// The session went live, ended, or was renamed.
    SessionChanged(BroadcastSession),

    /// Connection or activation flags changed for at least one platform.
    PlatformsChanged(Vec<Platform>),

    /// A linking handshake moved to a new phase.
    ConnectionProgress {
        /// Platform being linked.
        platform_id: String,

        /// Phase the handshake just entered.
        phase: ConnectionPhase,
    },

    /// A new metrics sample was produced.
    Metrics(LiveMetricsSample),

    /// A chat message arrived.
    Chat(ChatMessage),

    /// The advisory service returned suggestions.
    Suggestions(Suggestions),

    /// The advisory service returned a chat mood.
    Mood(MoodReport),

    /// The visible dashboard section changed.
    SectionChanged(DashboardSection),

    /// A command was refused. Nothing changed.
    Rejected {
        /// Command name.
        command: String,

        /// Human readable reason.
        message: String,
    },

    /// Full dashboard state, sent in reply to a snapshot request.
    Snapshot(Box<DashboardSnapshot>),

    /// Engine has shut down.
    Shutdown,
}
