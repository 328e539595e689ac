//! Commands sent from the host to the engine.

use serde::{Deserialize, Serialize};

use crate::state::DashboardSection;

/// Commands that the host can send to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Go live if idle, end the session if live.
    ToggleLive,

    /// Start the broadcast session.
    GoLive,

    /// End the broadcast session.
    EndLive,

    /// Flip a connected destination's active flag, or start linking a
    /// disconnected one.
    ToggleDestination { id: String },

    /// Start the linking handshake for a disconnected destination.
    LinkDestination { id: String },

    /// Drop the link to a destination (also deactivates it).
    UnlinkDestination { id: String },

    /// Replace the stream title.
    SetTitle(String),

    /// Use one of the most recently suggested titles.
    ApplySuggestedTitle(usize),

    /// Ask the advisory service for titles/tags for the current title.
    RequestSuggestions,

    /// Ask the advisory service to summarize the chat mood.
    AnalyzeMood,

    /// Switch the visible dashboard section.
    SelectSection(DashboardSection),

    /// Request a full snapshot of the dashboard.
    GetSnapshot,

    /// Shutdown the engine completely.
    Shutdown,
}

impl EngineCommand {
    /// Short name used in logs and rejection events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleLive => "toggle_live",
            Self::GoLive => "go_live",
            Self::EndLive => "end_live",
            Self::ToggleDestination { .. } => "toggle_destination",
            Self::LinkDestination { .. } => "link_destination",
            Self::UnlinkDestination { .. } => "unlink_destination",
            Self::SetTitle(_) => "set_title",
            Self::ApplySuggestedTitle(_) => "apply_suggested_title",
            Self::RequestSuggestions => "request_suggestions",
            Self::AnalyzeMood => "analyze_mood",
            Self::SelectSection(_) => "select_section",
            Self::GetSnapshot => "get_snapshot",
            Self::Shutdown => "shutdown",
        }
    }
}
