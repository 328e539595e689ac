//! Engine configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use gostream_ipc::EngineConfig;

/// Build the engine configuration from process environment variables.
pub fn from_env() -> Result<EngineConfig> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Build the engine configuration from `lookup`. Unset or empty variables
/// keep their defaults.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<EngineConfig> {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let mut config = EngineConfig::default();

    if let Some(dir) = var("GOSTREAM_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(ms) = var("GOSTREAM_TICK_MS") {
        config.metrics_tick = millis("GOSTREAM_TICK_MS", &ms)?;
    }
    if let Some(ms) = var("GOSTREAM_CHAT_TICK_MS") {
        config.chat_tick = millis("GOSTREAM_CHAT_TICK_MS", &ms)?;
    }
    if let Some(ms) = var("GOSTREAM_HANDSHAKE_MS") {
        config.handshake_step = millis("GOSTREAM_HANDSHAKE_MS", &ms)?;
    }
    if let Some(model) = var("GOSTREAM_ADVISORY_MODEL") {
        config.advisory_model = model;
    }
    config.advisory_api_key = var("GEMINI_API_KEY").or_else(|| var("API_KEY"));

    Ok(config)
}

fn millis(name: &str, value: &str) -> Result<Duration> {
    let ms: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a whole number of milliseconds"))?;
    anyhow::ensure!(ms > 0, "{name} must be positive");
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_vars() {
        let config = config(&[]).unwrap();
        assert_eq!(config.metrics_tick, Duration::from_secs(3));
        assert_eq!(config.handshake_step, Duration::from_millis(1500));
        assert!(config.data_dir.is_none());
        assert!(config.advisory_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GOSTREAM_DATA_DIR", "/tmp/gostream"),
            ("GOSTREAM_TICK_MS", "500"),
            ("GOSTREAM_CHAT_TICK_MS", "250"),
            ("GOSTREAM_HANDSHAKE_MS", "100"),
            ("GOSTREAM_ADVISORY_MODEL", "gemini-test"),
            ("API_KEY", "fallback"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/gostream")));
        assert_eq!(config.metrics_tick, Duration::from_millis(500));
        assert_eq!(config.chat_tick, Duration::from_millis(250));
        assert_eq!(config.handshake_step, Duration::from_millis(100));
        assert_eq!(config.advisory_model, "gemini-test");
        assert_eq!(config.advisory_api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_gemini_key_preferred() {
        let config = config(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "fallback")]).unwrap();
        assert_eq!(config.advisory_api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_bad_interval_rejected() {
        assert!(config(&[("GOSTREAM_TICK_MS", "fast")]).is_err());
        assert!(config(&[("GOSTREAM_HANDSHAKE_MS", "0")]).is_err());
    }
}
