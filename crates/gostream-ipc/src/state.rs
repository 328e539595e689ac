//! State machine types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phases of the simulated destination-linking handshake, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionPhase {
    /// No handshake in progress.
    #[default]
    Idle,

    /// Contacting the platform.
    Handshake,

    /// Exchanging the authorization code for tokens.
    TokenSwap,

    /// Registering the stream endpoint.
    Finalizing,

    /// Linked. Transient: the flow commits and returns to `Idle`.
    Done,
}

impl ConnectionPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Handshake),
            Self::Handshake => Some(Self::TokenSwap),
            Self::TokenSwap => Some(Self::Finalizing),
            Self::Finalizing => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Progress counter shown by the host. `Done` settles on the last step.
    pub fn step(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Handshake => 1,
            Self::TokenSwap => 2,
            Self::Finalizing | Self::Done => 3,
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Handshake => "Establishing handshake",
            Self::TokenSwap => "Exchanging tokens",
            Self::Finalizing => "Finalizing link",
            Self::Done => "Linked",
        }
    }
}

/// Sections of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DashboardSection {
    /// Preview, destinations and title editor.
    #[default]
    Dashboard,

    /// Metrics timeline.
    Analytics,

    /// Merged chat feed and mood.
    Chat,

    /// Platform integrations (link/unlink).
    ControlPanel,
}

impl DashboardSection {
    /// All sections in navigation order.
    pub const ALL: [Self; 4] = [
        Self::Dashboard,
        Self::Analytics,
        Self::Chat,
        Self::ControlPanel,
    ];

    /// Returns the header title for this section.
    pub fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Command Center",
            Self::Analytics => "Analytics",
            Self::Chat => "Chat Feed",
            Self::ControlPanel => "Control Panel",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Analytics => "analytics",
            Self::Chat => "chat",
            Self::ControlPanel => "settings",
        }
    }
}

impl fmt::Display for DashboardSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a string does not name a dashboard section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown dashboard section: {0}")]
pub struct UnknownSection(pub String);

impl FromStr for DashboardSection {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|section| section.key() == wanted)
            .ok_or(UnknownSection(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_reaches_done() {
        let mut phase = ConnectionPhase::Idle;
        let mut steps = vec![phase.step()];
        while let Some(next) = phase.next() {
            phase = next;
            steps.push(phase.step());
        }
        assert_eq!(phase, ConnectionPhase::Done);
        assert_eq!(steps, vec![0, 1, 2, 3, 3]);
    }

    #[test]
    fn test_section_parse_round_trips_display() {
        for section in DashboardSection::ALL {
            assert_eq!(section.to_string().parse::<DashboardSection>(), Ok(section));
        }
        assert!("pricing".parse::<DashboardSection>().is_err());
    }
}
