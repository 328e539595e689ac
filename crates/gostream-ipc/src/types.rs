//! Common types used across IPC messages.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{ConnectionPhase, DashboardSection};

/// Title used when nothing has been persisted yet.
pub const DEFAULT_TITLE: &str = "Chill Sunday Coding & Gaming 🚀";

/// CPU reading reported while the session is idle.
pub const IDLE_CPU_PERCENT: u32 = 2;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between metrics samples (default: 3s).
    pub metrics_tick: Duration,

    /// Interval between synthesized chat messages (default: 3s).
    pub chat_tick: Duration,

    /// Delay between handshake phases (default: 1.5s).
    pub handshake_step: Duration,

    /// Number of chat messages retained in the feed (default: 100).
    pub chat_capacity: usize,

    /// Number of samples retained for the analytics timeline (default: 60).
    pub metrics_history: usize,

    /// Directory holding persisted state. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,

    /// Advisory model name.
    pub advisory_model: String,

    /// Advisory API key. Without one the advisory service is disabled.
    #[serde(skip_serializing, default)]
    pub advisory_api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metrics_tick: Duration::from_secs(3),
            chat_tick: Duration::from_secs(3),
            handshake_step: Duration::from_millis(1500),
            chat_capacity: 100,
            metrics_history: 60,
            data_dir: None,
            advisory_model: "gemini-3-flash-preview".to_string(),
            advisory_api_key: None,
        }
    }
}

/// A broadcast destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Stable key (e.g. "twitch").
    pub id: String,

    /// Display name.
    pub name: String,

    /// Brand color as a hex string.
    pub color: String,

    /// Linking handshake has completed.
    pub connected: bool,

    /// Stream is sent to this destination. Implies `connected`.
    pub active: bool,
}

impl Platform {
    /// Create a disconnected, inactive platform.
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            connected: false,
            active: false,
        }
    }

    /// Returns true if the platform is linked and selected for broadcasting.
    pub fn is_broadcasting(&self) -> bool {
        self.active && self.connected
    }

    /// Label shown on the destination card.
    pub fn status_label(&self) -> &'static str {
        match (self.connected, self.active) {
            (false, _) => "Connect",
            (true, true) => "Streaming",
            (true, false) => "Standby",
        }
    }
}

/// The destinations every new installation starts with.
pub fn default_catalog() -> Vec<Platform> {
    let linked = |mut p: Platform| {
        p.connected = true;
        p.active = true;
        p
    };

    vec![
        linked(Platform::new("twitch", "Twitch", "#9146FF")),
        linked(Platform::new("youtube", "YouTube", "#FF0000")),
        Platform::new("kick", "Kick", "#53FC18"),
        Platform::new("facebook", "Facebook", "#1877F2"),
    ]
}

/// Liveness and title of the broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSession {
    /// The session is on air.
    pub is_live: bool,

    /// Stream title.
    pub title: String,
}

impl Default for BroadcastSession {
    fn default() -> Self {
        Self {
            is_live: false,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Simulated live metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMetricsSample {
    /// Concurrent viewers across all destinations.
    pub viewers: u64,

    /// Outgoing bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Encoder CPU usage percentage.
    pub cpu_percent: u32,

    /// Session uptime in seconds.
    pub uptime_seconds: u64,
}

impl LiveMetricsSample {
    /// Uptime formatted as `HH:MM:SS`.
    pub fn uptime_display(&self) -> String {
        let secs = self.uptime_seconds;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

impl Default for LiveMetricsSample {
    fn default() -> Self {
        Self {
            viewers: 0,
            bitrate_kbps: 0,
            cpu_percent: IDLE_CPU_PERCENT,
            uptime_seconds: 0,
        }
    }
}

/// A chat message from one of the destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique within one engine.
    pub id: u64,

    /// Author handle.
    pub user: String,

    /// Source platform id.
    pub platform: String,

    /// Message body.
    pub text: String,

    /// Arrival time.
    pub timestamp: DateTime<Utc>,
}

/// Title/tag suggestions for a stream topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    /// Three candidate titles.
    pub titles: Vec<String>,

    /// Five tags.
    pub tags: Vec<String>,

    /// Short SEO description.
    pub description: String,
}

/// Summary of the chat mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodReport {
    /// Single word mood (e.g. "hyped").
    pub mood: String,

    /// One or two sentence summary.
    pub summary: String,
}

/// Handshake currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProgress {
    /// Platform being linked.
    pub platform_id: String,

    /// Display name of that platform.
    pub platform_name: String,

    /// Current phase.
    pub phase: ConnectionPhase,
}

/// Everything the dashboard shows, at one instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Destinations in catalog order.
    pub platforms: Vec<Platform>,

    /// Liveness and title.
    pub session: BroadcastSession,

    /// Latest metrics (baseline while idle).
    pub metrics: LiveMetricsSample,

    /// Recent samples, oldest first.
    pub history: Vec<LiveMetricsSample>,

    /// Chat feed, oldest first.
    pub chat: Vec<ChatMessage>,

    /// Handshake in flight, if any.
    pub connection: Option<ConnectionProgress>,

    /// Last accepted suggestions.
    pub suggestions: Option<Suggestions>,

    /// Last accepted mood report.
    pub mood: Option<MoodReport>,

    /// Visible section.
    pub section: DashboardSection,
}

impl DashboardSnapshot {
    /// Number of destinations currently receiving the stream.
    pub fn active_destinations(&self) -> usize {
        self.platforms.iter().filter(|p| p.is_broadcasting()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_respects_active_implies_connected() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().all(|p| !p.active || p.connected));
        assert_eq!(
            catalog.iter().filter(|p| p.is_broadcasting()).count(),
            2
        );
    }

    #[test]
    fn test_uptime_display() {
        let sample = LiveMetricsSample {
            uptime_seconds: 3_725,
            ..Default::default()
        };
        assert_eq!(sample.uptime_display(), "01:02:05");
    }

    #[test]
    fn test_status_labels() {
        let mut p = Platform::new("kick", "Kick", "#53FC18");
        assert_eq!(p.status_label(), "Connect");
        p.connected = true;
        assert_eq!(p.status_label(), "Standby");
        p.active = true;
        assert_eq!(p.status_label(), "Streaming");
    }

    #[test]
    fn test_config_never_serializes_api_key() {
        let config = EngineConfig {
            advisory_api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
