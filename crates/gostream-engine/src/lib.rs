//! Control plane for the GoStream dashboard.
//!
//! This crate simulates a multi-destination broadcast session: linking
//! destinations, synthesizing live metrics and chat, and asking an advisory
//! service for titles and chat mood. [`BroadcastCoordinator`] holds the
//! deterministic core; [`Engine`] runs it on a thread against the wall clock.

mod advisory;
mod auth;
mod chat;
mod connection;
mod coordinator;
mod error;
mod metrics;
mod orchestrator;
mod random;
mod registry;
mod scheduler;
mod store;

pub use advisory::{
    dispatch, Advisor, AdvisoryKind, AdvisoryReply, AdvisoryRequest, AdvisoryTracker,
    DisabledAdvisor, GeminiAdvisor, RequestId, GEMINI_API_BASE,
};
pub use auth::{Accounts, Profile, Session, DEMO_EMAIL, DEMO_PASSWORD};
pub use chat::{ChatAggregator, MOOD_MIN_MESSAGES, MOOD_SAMPLE_SIZE};
pub use connection::{AttemptId, ConnectionAttempt, ConnectionFlow, FlowAdvance};
pub use coordinator::BroadcastCoordinator;
pub use error::{AdvisoryError, EngineError, StoreError};
pub use metrics::{MetricsConfig, SessionMetricsEngine};
pub use orchestrator::Engine;
pub use random::{RandomSource, RngSource, ScriptedRandom};
pub use registry::PlatformRegistry;
pub use scheduler::{Scheduler, TimerId};
pub use store::{
    load_json, save_json, FileStore, KeyValueStore, MemoryStore, StoreResult, PLATFORMS_KEY,
    TITLE_KEY,
};

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::info;

use gostream_ipc::{EngineCommand, EngineConfig, EngineEvent};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Open the store named by `config`: a [`FileStore`] when a data directory is
/// set, otherwise a [`MemoryStore`].
pub fn open_store(config: &EngineConfig) -> EngineResult<Arc<dyn KeyValueStore>> {
    match &config.data_dir {
        Some(dir) => Ok(Arc::new(FileStore::open(dir)?)),
        None => {
            info!("No data directory, dashboard state will not survive restarts");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Pick the advisory provider for `config`.
pub fn advisor_for(config: &EngineConfig) -> Arc<dyn Advisor> {
    match config.advisory_api_key.as_deref() {
        Some(key) if !key.is_empty() => Arc::new(GeminiAdvisor::new(
            key,
            config.advisory_model.clone(),
        )),
        _ => {
            info!("No advisory API key, suggestions and mood analysis disabled");
            Arc::new(DisabledAdvisor)
        }
    }
}

/// Create an engine instance with IPC channels.
pub fn create_engine(
    config: &EngineConfig,
    store: Arc<dyn KeyValueStore>,
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
) -> EngineResult<Engine> {
    let coordinator =
        BroadcastCoordinator::new(config, store, Box::new(RngSource::from_entropy()));
    Engine::new(coordinator, advisor_for(config), command_rx, event_tx)
}
