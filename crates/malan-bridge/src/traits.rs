// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the native surfaces a WebView host
// exposes to web code.
//
// The host decides what exists on each surface; the bridge only ever talks to
// these traits, never to a concrete WebView.

use std::collections::BTreeSet;
use std::sync::Arc;

use malan_core::error::Result;
use serde_json::Value;

/// Callback the iOS host invokes (at most once) with a call's result.
pub type NativeResultCallback = Box<dyn FnOnce(Value) + Send>;

/// Web-side handler the iOS host may call into by name.
pub type HandlerFn = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// The Android host's flat object of callable functions (`fromAndroid`).
///
/// Membership is host-defined and may grow after page load, so the bridge
/// re-queries it when a name is not yet registered.
pub trait AndroidSurface: Send + Sync {
    /// Names of every callable function currently on the object.
    fn callable_names(&self) -> BTreeSet<String>;

    /// Whether `name` is present and callable.
    fn is_callable(&self, name: &str) -> bool {
        self.callable_names().contains(name)
    }

    /// Call `name` with zero arguments (`None`) or one JSON string.
    ///
    /// Synchronous methods return their value here. Asynchronous methods
    /// return `Ok(None)` and deliver the result later through the shared
    /// `androidCallback` slot.
    fn invoke(&self, name: &str, payload: Option<&str>) -> Result<Option<Value>>;
}

/// A ready WKWebView JavaScript bridge.
pub trait IosBridgeHandle: Send + Sync {
    /// Ask the native handler `method` to run. The host answers through
    /// `callback`; an `Err` means the call could not be issued at all.
    fn call_handler(
        &self,
        method: &str,
        data: Option<Value>,
        callback: NativeResultCallback,
    ) -> Result<()>;

    /// Expose a web-side handler that native code can call into.
    fn register_handler(&self, name: &str, handler: HandlerFn);
}

/// The `webkit.messageHandlers` channel used to ask the host to inject the
/// bridge when it is not ready yet.
pub trait WebkitChannel: Send + Sync {
    /// Post the injection request (`iOS_Native_InjectJavascript`).
    fn request_bridge_injection(&self);
}
