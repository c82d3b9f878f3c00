// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Call dispatcher: performs exactly one native call for a resolved method
// config and produces exactly one `CallResult`.
//
// The two transports disagree on almost everything:
//
//   iOS      message channel; the handle may not exist yet, every call
//            answers through a callback.
//   Android  flat object of functions; arguments are zero or one JSON
//            string; sync methods return directly, async ones answer through
//            the single shared `androidCallback` slot.
//
// Whatever comes back is normalised the same way before callers see it.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, Either};
use futures_timer::Delay;
use malan_core::error::{BridgeError, Result};
use malan_core::{BridgeId, CallId, CallResult, MethodConfig, PlatformType};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::host::Host;
use crate::queue::PendingCalls;
use crate::traits::NativeResultCallback;

/// Replace a string holding a JSON object or array with the parsed value.
///
/// Native layers often stringify structured replies. Scalars, including
/// strings that happen to parse as a JSON number or literal, are left alone.
pub fn normalize_result(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => Value::String(text),
        },
        other => other,
    }
}

/// `undefined`/`null` replies carry no data.
fn reply_data(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(normalize_result(other)),
    }
}

/// Android accepts zero arguments or a single JSON string.
fn encode_payload(payload: Option<&Value>) -> Result<Option<String>> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|e| BridgeError::NativeInvocation(format!("payload serialization failed: {e}"))),
    }
}

/// One call, ready to go to native code.
#[derive(Debug, Clone)]
pub struct NativeCall {
    pub id: CallId,
    pub config: MethodConfig,
    pub payload: Option<Value>,
    /// Android async only: resolve once the call is handed off instead of
    /// waiting on `androidCallback`.
    pub fire_and_forget: bool,
}

/// Platform-specific call strategies over one host.
pub struct Dispatcher {
    owner: BridgeId,
    platform: PlatformType,
    host: Host,
    pending: Arc<PendingCalls>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        owner: BridgeId,
        platform: PlatformType,
        host: Host,
        pending: Arc<PendingCalls>,
        timeout: Duration,
    ) -> Self {
        Self {
            owner,
            platform,
            host,
            pending,
            timeout,
        }
    }

    pub fn platform(&self) -> PlatformType {
        self.platform
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `call` against the detected platform.
    #[instrument(skip_all, fields(call = %call.id, method = %call.config.name, platform = %self.platform))]
    pub async fn dispatch(&self, call: NativeCall) -> CallResult {
        match self.platform {
            PlatformType::Ios => self.call_ios(call).await,
            PlatformType::Android => self.call_android(call).await,
            PlatformType::Unknown => CallResult::from(BridgeError::BridgeUnavailable),
        }
    }

    async fn call_ios(&self, call: NativeCall) -> CallResult {
        // iOS handlers are registered under the logical name; `native_method`
        // only renames the Android function.
        let NativeCall { id, config, payload, .. } = call;
        let method = config.name;
        let reply = self.pending.register(id);
        let pending = Arc::clone(&self.pending);

        self.host.slots.with_ios_bridge(
            self.host.webkit.as_deref(),
            Box::new(move |bridge| {
                // Cleared or timed out while waiting for injection.
                if !pending.contains(id) {
                    debug!(call = %id, method = %method, "skipping cancelled iOS call");
                    return;
                }
                let resolver = Arc::clone(&pending);
                let callback: NativeResultCallback = Box::new(move |value| {
                    resolver.resolve(id, CallResult::ok(reply_data(value)));
                });
                if let Err(err) = bridge.call_handler(&method, payload, callback) {
                    error!(method = %method, error = %err, "iOS call failed");
                    pending.resolve(id, CallResult::from(err));
                }
            }),
        );

        self.await_reply(id, reply).await
    }

    async fn call_android(&self, call: NativeCall) -> CallResult {
        let Some(surface) = self.host.android.clone() else {
            return CallResult::from(BridgeError::AndroidUnavailable);
        };
        let native = call.config.native_name().to_string();
        if !surface.is_callable(&native) {
            return CallResult::from(BridgeError::NativeMethodMissing(native));
        }
        let payload = match encode_payload(call.payload.as_ref()) {
            Ok(payload) => payload,
            Err(err) => return CallResult::from(err),
        };

        if call.config.is_sync {
            return match surface.invoke(&native, payload.as_deref()) {
                Ok(value) => CallResult::ok(value.and_then(reply_data)),
                Err(err) => {
                    error!(method = %native, error = %err, "Android call failed");
                    CallResult::from(err)
                }
            };
        }

        if call.fire_and_forget {
            return match surface.invoke(&native, payload.as_deref()) {
                Ok(_) => CallResult::ok(None),
                Err(err) => {
                    error!(method = %native, error = %err, "Android call failed");
                    CallResult::from(err)
                }
            };
        }

        let id = call.id;
        let reply = self.pending.register(id);
        let pending = Arc::clone(&self.pending);
        let armed = self.host.slots.assign_android_callback(
            self.owner,
            id,
            Box::new(move |value| {
                pending.resolve(id, CallResult::ok(reply_data(value)));
            }),
        );
        if let Err(err) = armed {
            self.pending.forget(id);
            return CallResult::from(err);
        }

        if let Err(err) = surface.invoke(&native, payload.as_deref()) {
            error!(method = %native, error = %err, "Android call failed");
            self.host.slots.release_android_callback(self.owner, id);
            self.pending.forget(id);
            return CallResult::from(err);
        }

        let result = self.await_reply(id, reply).await;
        if !result.success {
            self.host.slots.release_android_callback(self.owner, id);
        }
        result
    }

    /// Wait for `id`'s native reply, failing it once the timeout elapses.
    async fn await_reply(&self, id: CallId, reply: oneshot::Receiver<CallResult>) -> CallResult {
        match future::select(reply, Delay::new(self.timeout)).await {
            Either::Left((Ok(result), _)) => {
                debug!(call = %id, success = result.success, "native reply received");
                result
            }
            // The resolver was discarded without an answer: bulk cancellation.
            Either::Left((Err(_), _)) => CallResult::from(BridgeError::QueueCleared),
            Either::Right(((), reply)) => {
                if self.pending.forget(id) {
                    warn!(call = %id, timeout = ?self.timeout, "native reply timed out");
                    CallResult::from(BridgeError::Timeout)
                } else {
                    // Answered (or swept) while the timer fired.
                    reply.await.unwrap_or_else(|_| CallResult::from(BridgeError::Timeout))
                }
            }
        }
    }
}
