// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted native surfaces for unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use malan_core::error::{BridgeError, Result};
use serde_json::Value;

use crate::lock;
use crate::traits::{AndroidSurface, HandlerFn, IosBridgeHandle, NativeResultCallback, WebkitChannel};

pub const ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
pub const IOS_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";

/// What a scripted Android function does when called.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Return this value synchronously (`None` = `undefined`).
    Returns(Option<Value>),
    /// Throw on the native side.
    Throws(String),
}

/// Scripted `fromAndroid` object that records every invocation.
#[derive(Default)]
pub struct MockAndroid {
    methods: Mutex<HashMap<String, Behaviour>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl MockAndroid {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(self: Arc<Self>, name: &str, behaviour: Behaviour) -> Arc<Self> {
        self.define(name, behaviour);
        self
    }

    /// Add a function after page load.
    pub fn define(&self, name: &str, behaviour: Behaviour) {
        lock(&self.methods).insert(name.to_string(), behaviour);
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        lock(&self.calls).clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|(name, _)| name.clone()).collect()
    }
}

impl AndroidSurface for MockAndroid {
    fn callable_names(&self) -> BTreeSet<String> {
        lock(&self.methods).keys().cloned().collect()
    }

    fn invoke(&self, name: &str, payload: Option<&str>) -> Result<Option<Value>> {
        lock(&self.calls).push((name.to_string(), payload.map(str::to_string)));
        let behaviour = lock(&self.methods).get(name).cloned();
        match behaviour {
            Some(Behaviour::Returns(value)) => Ok(value),
            Some(Behaviour::Throws(message)) => Err(BridgeError::NativeInvocation(message)),
            None => Err(BridgeError::NativeInvocation(format!("{name} is not a function"))),
        }
    }
}

/// Scripted WKWebView bridge. Calls either auto-reply or park their
/// callbacks until the test answers them.
#[derive(Default)]
pub struct MockIosBridge {
    replies: Mutex<HashMap<String, Value>>,
    fail_with: Mutex<Option<String>>,
    parked: Mutex<Vec<(String, NativeResultCallback)>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    handlers: Mutex<HashMap<String, HandlerFn>>,
}

impl MockIosBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(self: Arc<Self>, method: &str, value: Value) -> Arc<Self> {
        lock(&self.replies).insert(method.to_string(), value);
        self
    }

    pub fn failing(self: Arc<Self>, message: &str) -> Arc<Self> {
        *lock(&self.fail_with) = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>)> {
        lock(&self.calls).clone()
    }

    /// Answer the oldest parked call for `method`.
    pub fn answer(&self, method: &str, value: Value) -> bool {
        let callback = {
            let mut parked = lock(&self.parked);
            parked
                .iter()
                .position(|(name, _)| name == method)
                .map(|index| parked.remove(index).1)
        };
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    /// Play the native side calling a registered web handler.
    pub fn invoke_handler(&self, name: &str, data: Option<Value>) -> bool {
        let handler = lock(&self.handlers).get(name).cloned();
        match handler {
            Some(handler) => {
                handler(data);
                true
            }
            None => false,
        }
    }
}

impl IosBridgeHandle for MockIosBridge {
    fn call_handler(&self, method: &str, data: Option<Value>, callback: NativeResultCallback) -> Result<()> {
        if let Some(message) = lock(&self.fail_with).clone() {
            return Err(BridgeError::NativeInvocation(message));
        }
        lock(&self.calls).push((method.to_string(), data));
        let reply = lock(&self.replies).get(method).cloned();
        match reply {
            Some(value) => callback(value),
            None => lock(&self.parked).push((method.to_string(), callback)),
        }
        Ok(())
    }

    fn register_handler(&self, name: &str, handler: HandlerFn) {
        lock(&self.handlers).insert(name.to_string(), handler);
    }
}

/// Counts injection requests posted through `webkit.messageHandlers`.
#[derive(Default)]
pub struct MockWebkit {
    requests: AtomicUsize,
}

impl MockWebkit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl WebkitChannel for MockWebkit {
    fn request_bridge_injection(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}
