//! Typed host<->engine messages for the GoStream control plane.
//!
//! This crate defines the data model shared by the engine and whatever host
//! drives it (the CLI today), plus the bounded channels they talk over.

mod commands;
mod events;
mod state;
mod types;

pub use commands::EngineCommand;
pub use events::EngineEvent;
pub use state::{ConnectionPhase, DashboardSection, UnknownSection};
pub use types::{
    default_catalog, BroadcastSession, ChatMessage, ConnectionProgress, DashboardSnapshot,
    EngineConfig, LiveMetricsSample, MoodReport, Platform, Suggestions, DEFAULT_TITLE,
    IDLE_CPU_PERCENT,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (host → engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (engine → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
