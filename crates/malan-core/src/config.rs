// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::MethodConfig;

/// Default window after which an unanswered native callback is reclaimed.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 60_000;

/// Settings for one bridge instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Statically registered methods. Applied after auto-detection, so they
    /// override detected entries of the same name.
    pub methods: Vec<MethodConfig>,
    /// Emit per-call debug traces.
    pub debug: bool,
    /// Enumerate the Android surface on init and register unknown names
    /// lazily at call time.
    pub auto_detect: bool,
    /// Window (ms) before a pending native callback fails with a timeout.
    pub call_timeout_ms: u64,
    /// Run at most one native call at a time, in submission order.
    pub serialize_calls: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            methods: Vec::new(),
            debug: false,
            auto_detect: true,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            serialize_calls: true,
        }
    }
}

impl BridgeConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Parse a JSON document; missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert!(config.auto_detect);
        assert!(config.serialize_calls);
        assert!(!config.debug);
        assert_eq!(config.call_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(
            r#"{"debug": true, "callTimeoutMs": 250, "methods": [{"name": "getVersion", "isSync": true}]}"#,
        )
        .expect("parse");
        assert!(config.debug);
        assert!(config.auto_detect);
        assert_eq!(config.call_timeout(), Duration::from_millis(250));
        assert_eq!(config.methods, vec![MethodConfig::sync("getVersion")]);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{"autoDetect": false, "serializeCalls": false}"#).expect("write");

        let config = BridgeConfig::load(&path).expect("load");
        assert!(!config.auto_detect);
        assert!(!config.serialize_calls);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = BridgeConfig::load("/nonexistent/malan.json").unwrap_err();
        assert!(matches!(err, crate::BridgeError::Io(_)));
    }
}
