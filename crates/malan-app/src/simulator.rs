// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process stand-ins for the native side of an app WebView.
//
// Asynchronous answers are delivered from spawned tokio tasks after a short
// delay, the way a real host answers from its own thread.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use malan_bridge::Host;
use malan_bridge::HostSlots;
use malan_bridge::traits::{AndroidSurface, HandlerFn, IosBridgeHandle, NativeResultCallback, WebkitChannel};
use malan_core::error::{BridgeError, Result};
use serde_json::{Value, json};
use tracing::{debug, info};

pub const ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
pub const IOS_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";

const REPLY_DELAY: Duration = Duration::from_millis(30);

/// Canned answer for an app method, shared by both platforms.
fn canned_reply(method: &str, payload: Option<&Value>) -> Option<Value> {
    match method {
        "getVersion" => Some(json!("3.8.1")),
        "getUserInfo" => Some(json!(r#"{"uid":1024,"nickname":"malan","vip":true}"#)),
        "share" => Some(json!({ "shared": payload.cloned().unwrap_or(Value::Null) })),
        "refreshToken" => Some(Value::Null),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Android
// ---------------------------------------------------------------------------

/// Simulated `fromAndroid` object. `getVersion` answers synchronously,
/// everything else through `androidCallback`.
struct SimAndroid {
    slots: Arc<HostSlots>,
}

impl AndroidSurface for SimAndroid {
    fn callable_names(&self) -> BTreeSet<String> {
        ["getVersion", "getUserInfo", "share", "refreshToken"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn invoke(&self, name: &str, payload: Option<&str>) -> Result<Option<Value>> {
        let payload = payload.map(serde_json::from_str::<Value>).transpose()?;
        debug!(method = name, ?payload, "android host invoked");
        let reply = canned_reply(name, payload.as_ref())
            .ok_or_else(|| BridgeError::NativeInvocation(format!("{name} is not a function")))?;

        if name == "getVersion" {
            return Ok(Some(reply));
        }
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            tokio::time::sleep(REPLY_DELAY).await;
            slots.android_callback(reply);
        });
        Ok(None)
    }
}

pub fn android_host() -> Host {
    let slots = Arc::new(HostSlots::new());
    let surface = Arc::new(SimAndroid {
        slots: Arc::clone(&slots),
    });
    Host {
        slots,
        ..Host::android(ANDROID_UA, surface)
    }
}

// ---------------------------------------------------------------------------
// iOS
// ---------------------------------------------------------------------------

/// Simulated WKWebView bridge. Unknown handlers never answer.
#[derive(Default)]
struct SimIosBridge {
    handlers: Mutex<HashMap<String, HandlerFn>>,
}

impl IosBridgeHandle for SimIosBridge {
    fn call_handler(&self, method: &str, data: Option<Value>, callback: NativeResultCallback) -> Result<()> {
        debug!(method, ?data, "ios host invoked");
        if let Some(reply) = canned_reply(method, data.as_ref()) {
            tokio::spawn(async move {
                tokio::time::sleep(REPLY_DELAY).await;
                callback(reply);
            });
        }
        Ok(())
    }

    fn register_handler(&self, name: &str, handler: HandlerFn) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handler);
    }
}

/// Simulated `webkit.messageHandlers`: injects the bridge shortly after
/// the first request.
struct SimWebkit {
    slots: Arc<HostSlots>,
}

impl WebkitChannel for SimWebkit {
    fn request_bridge_injection(&self) {
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            tokio::time::sleep(REPLY_DELAY).await;
            info!("simulated host injected the iOS bridge");
            slots.ios_bridge_ready(Arc::new(SimIosBridge::default()));
        });
    }
}

pub fn ios_host() -> Host {
    let slots = Arc::new(HostSlots::new());
    let webkit = Arc::new(SimWebkit {
        slots: Arc::clone(&slots),
    });
    Host {
        slots,
        ..Host::ios(IOS_UA, webkit)
    }
}
