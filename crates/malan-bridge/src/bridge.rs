// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge facade: the one object application code talks to.
//
// A call is resolved against the registry (auto-detecting unknown names),
// enqueued, and dispatched once its turn comes.  The returned `PendingCall`
// always resolves to a `CallResult`; failures are values, never panics or
// `Err`s.  Submission happens eagerly in `call`, so FIFO order is the order
// in which `call` was invoked, not the order in which futures are first
// polled.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::oneshot;
use malan_core::error::{BridgeError, Result};
use malan_core::{AppEvent, BridgeConfig, BridgeId, CallId, CallResult, MethodConfig, PlatformType};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatcher, NativeCall};
use crate::events::{EventHub, Listener, ListenerId};
use crate::host::Host;
use crate::lock;
use crate::platform::PlatformInfo;
use crate::queue::{Admission, CallQueue, PendingCalls, Turn};
use crate::registry::MethodRegistry;
use crate::traits::{HandlerFn, IosBridgeHandle};

/// Invoked once with a call's result, just before its future resolves.
pub type ResultCallback = Box<dyn FnOnce(&CallResult) + Send>;

/// Per-call options.
///
/// ```ignore
/// let result = bridge
///     .call("getUserInfo", CallOptions::new().payload(json!({"full": true})))
///     .await;
/// ```
#[derive(Default)]
pub struct CallOptions {
    payload: Option<Value>,
    on_result: Option<ResultCallback>,
    sync: Option<bool>,
    fire_and_forget: bool,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data handed to the native method.
    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Callback run with the result in addition to the returned future.
    pub fn on_result(mut self, callback: impl FnOnce(&CallResult) + Send + 'static) -> Self {
        self.on_result = Some(Box::new(callback));
        self
    }

    /// Override the registered `is_sync` for this call only.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Android async methods: resolve once the call is handed to the host
    /// instead of waiting for `androidCallback`.
    pub fn fire_and_forget(mut self) -> Self {
        self.fire_and_forget = true;
        self
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("payload", &self.payload)
            .field("on_result", &self.on_result.is_some())
            .field("sync", &self.sync)
            .field("fire_and_forget", &self.fire_and_forget)
            .finish()
    }
}

/// A submitted call. Resolves exactly once; dropping it before completion
/// withdraws the call from the queue.
#[must_use = "a dropped call is withdrawn from the queue"]
pub struct PendingCall {
    id: CallId,
    future: Pin<Box<dyn Future<Output = CallResult> + Send>>,
}

impl PendingCall {
    pub fn id(&self) -> CallId {
        self.id
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<CallResult> {
        self.future.as_mut().poll(cx)
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall").field("id", &self.id).finish_non_exhaustive()
    }
}

struct BridgeInner {
    id: BridgeId,
    platform: PlatformType,
    host: Host,
    registry: Mutex<MethodRegistry>,
    auto_detect: AtomicBool,
    debug: bool,
    serialize_calls: bool,
    timeout: Duration,
    events: Arc<EventHub>,
    queue: Arc<CallQueue>,
    pending: Arc<PendingCalls>,
    dispatcher: Dispatcher,
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.host.slots.detach(self.id);
    }
}

/// Web-side handle on the host's native bridge. Cheap to clone.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.inner.id)
            .field("platform", &self.inner.platform)
            .field("methods", &lock(&self.inner.registry).len())
            .finish()
    }
}

impl Bridge {
    /// Attach to `host` and prepare the registry and event entry points.
    ///
    /// Fails with [`BridgeError::SlotOwned`] while another bridge is attached
    /// to the same host.
    pub fn new(host: Host, config: BridgeConfig) -> Result<Self> {
        let id = BridgeId::new();
        let platform = host.detector().platform_type();
        host.slots.attach(id)?;

        let events = Arc::new(EventHub::new());
        for event in AppEvent::ALL {
            let hub = Arc::clone(&events);
            let installed = host
                .slots
                .install_event_trigger(id, event.as_str(), Arc::new(move || {
                    hub.emit(event);
                }));
            if let Err(err) = installed {
                host.slots.detach(id);
                return Err(err);
            }
        }

        let mut registry = MethodRegistry::new();
        if config.auto_detect && platform == PlatformType::Android {
            if let Some(surface) = host.android.as_deref() {
                registry.auto_detect_android(surface);
            }
        }
        registry.register_methods(config.methods.iter().cloned());

        let timeout = config.call_timeout();
        let pending = Arc::new(PendingCalls::new());
        let dispatcher = Dispatcher::new(id, platform, host.clone(), Arc::clone(&pending), timeout);

        info!(
            bridge = %id,
            platform = %platform,
            methods = registry.len(),
            serialize_calls = config.serialize_calls,
            "bridge initialised"
        );

        Ok(Self {
            inner: Arc::new(BridgeInner {
                id,
                platform,
                host,
                registry: Mutex::new(registry),
                auto_detect: AtomicBool::new(config.auto_detect),
                debug: config.debug,
                serialize_calls: config.serialize_calls,
                timeout,
                events,
                queue: Arc::new(CallQueue::new()),
                pending,
                dispatcher,
            }),
        })
    }

    pub fn id(&self) -> BridgeId {
        self.inner.id
    }

    pub fn platform_type(&self) -> PlatformType {
        self.inner.platform
    }

    pub fn platform_info(&self) -> PlatformInfo {
        self.inner.host.detector().info()
    }

    // -- calls ---------------------------------------------------------------

    /// Call the native method `name`.
    pub fn call(&self, name: &str, options: CallOptions) -> PendingCall {
        let id = CallId::new();
        let CallOptions {
            payload,
            on_result,
            sync,
            fire_and_forget,
        } = options;

        let prepared = match self.resolve(name) {
            Some(mut config) => {
                if let Some(sync) = sync {
                    config.is_sync = sync;
                }
                if self.inner.debug {
                    debug!(call = %id, method = name, is_sync = config.is_sync, native = config.native_name(), "call submitted");
                }
                let generation = self.inner.queue.generation();
                let ticket = self.inner.serialize_calls.then(|| self.inner.queue.submit(id, name));
                let call = NativeCall {
                    id,
                    config,
                    payload,
                    fire_and_forget,
                };
                Ok((call, generation, ticket))
            }
            None => {
                if self.inner.debug {
                    debug!(call = %id, method = name, "no method config");
                }
                Err(CallResult::from(BridgeError::MethodNotFound(name.to_string())))
            }
        };

        let inner = Arc::clone(&self.inner);
        let future = async move {
            let result = match prepared {
                Ok((call, generation, ticket)) => run(inner, call, generation, ticket).await,
                Err(result) => result,
            };
            if let Some(on_result) = on_result {
                on_result(&result);
            }
            result
        };

        PendingCall {
            id,
            future: Box::pin(future),
        }
    }

    /// Alias of [`Bridge::call`].
    pub fn call_method(&self, name: &str, options: CallOptions) -> PendingCall {
        self.call(name, options)
    }

    /// Alias of [`Bridge::call`], named after the iOS bridge primitive.
    pub fn call_handler(&self, name: &str, options: CallOptions) -> PendingCall {
        self.call(name, options)
    }

    /// Registered config for `name`, auto-detecting it if allowed.
    fn resolve(&self, name: &str) -> Option<MethodConfig> {
        let inner = &self.inner;
        let mut registry = lock(&inner.registry);
        if let Some(config) = registry.get(name) {
            return Some(config.clone());
        }
        if !inner.auto_detect.load(Ordering::Acquire) {
            return None;
        }
        match inner.platform {
            PlatformType::Android => {
                let surface = inner.host.android.as_deref()?;
                registry.try_register_android(surface, name).cloned()
            }
            PlatformType::Ios => Some(registry.register_optimistic(name).clone()),
            PlatformType::Unknown => None,
        }
    }

    // -- registry ------------------------------------------------------------

    pub fn register_method(&self, config: MethodConfig) {
        lock(&self.inner.registry).register_method(config);
    }

    pub fn register_methods(&self, configs: impl IntoIterator<Item = MethodConfig>) {
        lock(&self.inner.registry).register_methods(configs);
    }

    /// Registered method names, sorted.
    pub fn registered_methods(&self) -> Vec<String> {
        lock(&self.inner.registry).names()
    }

    pub fn has_method(&self, name: &str) -> bool {
        lock(&self.inner.registry).contains(name)
    }

    pub fn method(&self, name: &str) -> Option<MethodConfig> {
        lock(&self.inner.registry).get(name).cloned()
    }

    // -- events --------------------------------------------------------------

    pub fn on(&self, event: AppEvent, listener: Listener) -> ListenerId {
        self.inner.events.on(event, listener)
    }

    pub fn off(&self, event: AppEvent, listener: Option<ListenerId>) -> usize {
        self.inner.events.off(event, listener)
    }

    pub fn listener_count(&self, event: AppEvent) -> usize {
        self.inner.events.listener_count(event)
    }

    /// Expose `handler` to native code under `name`. iOS only; elsewhere
    /// this logs a warning and does nothing.
    pub fn register_handler(&self, name: &str, handler: HandlerFn) {
        if self.inner.platform != PlatformType::Ios {
            warn!(handler = name, platform = %self.inner.platform, "registerHandler is only supported on iOS");
            return;
        }
        let name = name.to_string();
        self.inner.host.slots.with_ios_bridge(
            self.inner.host.webkit.as_deref(),
            Box::new(move |bridge| {
                debug!(handler = %name, "registering iOS handler");
                bridge.register_handler(&name, handler);
            }),
        );
    }

    /// The iOS bridge handle, waiting for injection if necessary. `None`
    /// on other platforms.
    pub async fn ios_bridge(&self) -> Option<Arc<dyn IosBridgeHandle>> {
        if self.inner.platform != PlatformType::Ios {
            return None;
        }
        self.inner.host.slots.ios_bridge(self.inner.host.webkit.as_deref()).await
    }

    // -- lifecycle -----------------------------------------------------------

    /// No call in flight and none waiting.
    pub fn is_idle(&self) -> bool {
        self.inner.queue.is_idle()
    }

    /// Calls waiting for their turn.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Fail every queued and in-flight call with "Queue cleared" and reset
    /// the queue to idle.
    pub fn clear_queue(&self) {
        let inner = &self.inner;
        let queued = inner.queue.clear();
        let pending = inner.pending.fail_all(BridgeError::QueueCleared);
        if let Some(call) = inner.host.slots.android_callback_owner() {
            inner.host.slots.release_android_callback(inner.id, call);
        }
        info!(bridge = %inner.id, queued, pending, "call queue cleared");
    }

    /// Tear the bridge down: cancel outstanding work, drop listeners and
    /// methods, and release the host slots. Later calls resolve "Method
    /// <name> not found".
    pub fn destroy(&self) {
        let inner = &self.inner;
        inner.auto_detect.store(false, Ordering::Release);
        inner.events.clear();
        lock(&inner.registry).clear();
        self.clear_queue();
        inner.host.slots.detach(inner.id);
        info!(bridge = %inner.id, "bridge destroyed");
    }
}

/// Wait for the queue to admit `call`, then dispatch it. The turn is held
/// until the native call settles.
async fn run(
    inner: Arc<BridgeInner>,
    call: NativeCall,
    generation: u64,
    ticket: Option<(Turn, oneshot::Receiver<Admission>)>,
) -> CallResult {
    let _turn = match ticket {
        Some((turn, admission)) => match admission.await {
            Ok(Admission::Proceed) => Some(turn),
            Ok(Admission::Cleared) | Err(_) => return CallResult::from(BridgeError::QueueCleared),
        },
        None => None,
    };
    // The head call is admitted at submit time, before it is ever polled, so
    // a clear in between only shows up as a newer generation.
    if inner.queue.generation() != generation {
        debug!(call = %call.id, method = %call.config.name, "call cleared before dispatch");
        return CallResult::from(BridgeError::QueueCleared);
    }

    inner.pending.sweep_expired(inner.timeout);
    let id = call.id;
    let result = inner.dispatcher.dispatch(call).await;
    if inner.debug {
        debug!(call = %id, success = result.success, "call settled");
    }
    result
}
