// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Method registry: logical method name → how to call it natively.
//
// Entries come from static configuration or from auto-detection.  On Android
// the host object can be enumerated, so unknown names are checked against it
// before they are registered.  The iOS bridge cannot be introspected, so an
// unknown name is registered optimistically and the call itself decides.

use std::collections::HashMap;

use malan_core::MethodConfig;
use tracing::debug;

use crate::traits::AndroidSurface;

/// Registered method configurations, keyed by logical name.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, MethodConfig>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `config.name`.
    pub fn register_method(&mut self, config: MethodConfig) {
        self.methods.insert(config.name.clone(), config);
    }

    /// Register in order; a later entry wins on a name collision.
    pub fn register_methods(&mut self, configs: impl IntoIterator<Item = MethodConfig>) {
        for config in configs {
            self.register_method(config);
        }
    }

    pub fn get(&self, name: &str) -> Option<&MethodConfig> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn clear(&mut self) {
        self.methods.clear();
    }

    /// Register every callable on the Android object as an async method
    /// targeting its own name. Returns how many were found.
    pub fn auto_detect_android(&mut self, surface: &dyn AndroidSurface) -> usize {
        let names = surface.callable_names();
        for name in &names {
            self.register_method(MethodConfig::new(name.as_str()));
        }
        if !names.is_empty() {
            debug!(count = names.len(), methods = ?names, "detected Android methods");
        }
        names.len()
    }

    /// Register `name` if the Android object has gained it since init.
    pub fn try_register_android(&mut self, surface: &dyn AndroidSurface, name: &str) -> Option<&MethodConfig> {
        if !surface.is_callable(name) {
            return None;
        }
        debug!(method = name, "registered Android method on first use");
        self.register_method(MethodConfig::new(name));
        self.methods.get(name)
    }

    /// Register `name` without validation (iOS).
    pub fn register_optimistic(&mut self, name: &str) -> &MethodConfig {
        debug!(method = name, "registered iOS method optimistically");
        self.methods
            .entry(name.to_string())
            .or_insert_with(|| MethodConfig::new(name))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::{Behaviour, MockAndroid};

    #[test]
    fn register_is_idempotent() {
        let mut registry = MethodRegistry::new();
        registry.register_method(MethodConfig::new("share"));
        registry.register_method(MethodConfig::new("share"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = MethodRegistry::new();
        registry.register_methods([
            MethodConfig::new("getVersion"),
            MethodConfig::sync("getVersion").with_native_method("appVersion"),
        ]);
        let config = registry.get("getVersion").expect("registered");
        assert!(config.is_sync);
        assert_eq!(config.native_name(), "appVersion");
    }

    #[test]
    fn auto_detect_registers_async_methods() {
        let android = MockAndroid::new()
            .with("getUserInfo", Behaviour::Returns(None))
            .with("closePage", Behaviour::Returns(None));
        let mut registry = MethodRegistry::new();

        assert_eq!(registry.auto_detect_android(&*android), 2);
        assert_eq!(registry.names(), vec!["closePage".to_string(), "getUserInfo".to_string()]);
        let config = registry.get("closePage").expect("detected");
        assert!(!config.is_sync);
        assert_eq!(config.native_name(), "closePage");
    }

    #[test]
    fn late_android_methods_are_found_lazily() {
        let android = MockAndroid::new();
        let mut registry = MethodRegistry::new();
        assert_eq!(registry.auto_detect_android(&*android), 0);
        assert!(registry.try_register_android(&*android, "scan").is_none());

        android.define("scan", Behaviour::Returns(Some(json!("ok"))));
        assert!(registry.try_register_android(&*android, "scan").is_some());
        assert!(registry.contains("scan"));
    }

    #[test]
    fn optimistic_registration_keeps_existing_entry() {
        let mut registry = MethodRegistry::new();
        registry.register_method(MethodConfig::sync("ping"));
        assert!(registry.register_optimistic("ping").is_sync);
        assert!(!registry.register_optimistic("pong").is_sync);
    }
}
