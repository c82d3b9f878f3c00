// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Malan native bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::BridgeError;

/// Unique identifier for a single bridge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a bridge instance, used to assert ownership of host slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeId(pub Uuid);

impl BridgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BridgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Native transport selected for this process. Computed once per bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    /// WKWebView message bridge.
    Ios,
    /// Host-injected `fromAndroid` object.
    Android,
    /// Plain browser or desktop; no native calls are possible.
    Unknown,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to invoke one logical bridge method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodConfig {
    /// Logical name, unique within a registry.
    pub name: String,
    /// `true` when the native side returns the result directly.
    #[serde(default)]
    pub is_sync: bool,
    /// Name of the native function when it differs from `name`.
    #[serde(default, alias = "androidMethod", skip_serializing_if = "Option::is_none")]
    pub native_method: Option<String>,
}

impl MethodConfig {
    /// Asynchronous method whose native target is its own name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_sync: false,
            native_method: None,
        }
    }

    /// Synchronous method whose native target is its own name.
    pub fn sync(name: impl Into<String>) -> Self {
        Self {
            is_sync: true,
            ..Self::new(name)
        }
    }

    pub fn with_native_method(mut self, native: impl Into<String>) -> Self {
        self.native_method = Some(native.into());
        self
    }

    /// The function name to look up on the Android object. iOS handlers
    /// are always called by `name`.
    pub fn native_name(&self) -> &str {
        self.native_method.as_deref().unwrap_or(&self.name)
    }
}

/// Uniform envelope produced exactly once per bridge call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl From<BridgeError> for CallResult {
    fn from(err: BridgeError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Native-pushed application events. The set is fixed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppEvent {
    #[serde(rename = "enterDeActivated")]
    EnterDeActivated,
    #[serde(rename = "enterActivated")]
    EnterActivated,
    #[serde(rename = "onPageShow")]
    OnPageShow,
    #[serde(rename = "shareSuccess")]
    ShareSuccess,
    #[serde(rename = "onWxOpenId")]
    OnWxOpenId,
}

impl AppEvent {
    pub const ALL: [AppEvent; 5] = [
        AppEvent::EnterDeActivated,
        AppEvent::EnterActivated,
        AppEvent::OnPageShow,
        AppEvent::ShareSuccess,
        AppEvent::OnWxOpenId,
    ];

    /// Name the host uses when firing the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnterDeActivated => "enterDeActivated",
            Self::EnterActivated => "enterActivated",
            Self::OnPageShow => "onPageShow",
            Self::ShareSuccess => "shareSuccess",
            Self::OnWxOpenId => "onWxOpenId",
        }
    }
}

impl fmt::Display for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an event name outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown app event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for AppEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}
