// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-facing state shared between the web side and the native host.
//
// A WebView host talks to page code through a handful of process-wide
// globals: the single `androidCallback` slot, the `fromWeb` namespace of
// event triggers, and the list of callbacks waiting for the iOS bridge to be
// injected.  They are modelled here as one explicit cell, `HostSlots`, that
// is owned by at most one live bridge at a time.  Every reassignment checks
// the caller's `BridgeId`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use malan_core::error::{BridgeError, Result};
use malan_core::{BridgeId, CallId};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::lock;
use crate::platform::PlatformDetector;
use crate::traits::{AndroidSurface, IosBridgeHandle, WebkitChannel};

/// Resolver parked in the `androidCallback` slot.
pub type AndroidCallback = Box<dyn FnOnce(Value) + Send>;

/// Zero-argument entry point in the `fromWeb` namespace.
pub type EventTrigger = Arc<dyn Fn() + Send + Sync>;

/// Consumer waiting for the iOS bridge handle.
pub type ReadyCallback = Box<dyn FnOnce(Arc<dyn IosBridgeHandle>) + Send>;

enum IosReadiness {
    /// Nobody has asked for the bridge yet.
    Idle,
    /// Injection was requested; consumers are queued.
    Waiting(Vec<ReadyCallback>),
    Ready(Arc<dyn IosBridgeHandle>),
}

/// Process-wide slots the native host reads and writes.
pub struct HostSlots {
    owner: Mutex<Option<BridgeId>>,
    android_callback: Mutex<Option<(CallId, AndroidCallback)>>,
    from_web: Mutex<HashMap<String, EventTrigger>>,
    ios: Mutex<IosReadiness>,
}

impl Default for HostSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSlots")
            .field("owner", &*lock(&self.owner))
            .field("android_callback_armed", &lock(&self.android_callback).is_some())
            .field("from_web", &lock(&self.from_web).len())
            .finish()
    }
}

impl HostSlots {
    pub fn new() -> Self {
        Self {
            owner: Mutex::new(None),
            android_callback: Mutex::new(None),
            from_web: Mutex::new(HashMap::new()),
            ios: Mutex::new(IosReadiness::Idle),
        }
    }

    /// Current owner, if a bridge is attached.
    pub fn owner(&self) -> Option<BridgeId> {
        *lock(&self.owner)
    }

    /// Claim the slots for `id`. Fails if another bridge still owns them.
    pub fn attach(&self, id: BridgeId) -> Result<()> {
        let mut owner = lock(&self.owner);
        match *owner {
            Some(current) if current != id => Err(BridgeError::SlotOwned(current.to_string())),
            _ => {
                *owner = Some(id);
                debug!(bridge = %id, "host slots attached");
                Ok(())
            }
        }
    }

    /// Release the slots if `id` owns them, dropping its callback and
    /// event triggers. The iOS readiness state belongs to the host and is
    /// kept.
    pub fn detach(&self, id: BridgeId) {
        let mut owner = lock(&self.owner);
        if *owner != Some(id) {
            return;
        }
        *owner = None;
        drop(owner);

        let stale_callback = lock(&self.android_callback).take();
        let stale_triggers = std::mem::take(&mut *lock(&self.from_web));
        drop(stale_callback);
        drop(stale_triggers);
        debug!(bridge = %id, "host slots detached");
    }

    fn ensure_owner(&self, id: BridgeId) -> Result<()> {
        match *lock(&self.owner) {
            Some(current) if current == id => Ok(()),
            Some(current) => Err(BridgeError::SlotOwned(current.to_string())),
            None => Err(BridgeError::SlotOwned("detached".into())),
        }
    }

    // -- androidCallback -----------------------------------------------------

    /// Point the shared Android callback at the resolver of `call`.
    ///
    /// Whatever was parked before is dropped: the slot holds exactly one
    /// resolver, which is why overlapping asynchronous Android calls race.
    pub fn assign_android_callback(&self, id: BridgeId, call: CallId, callback: AndroidCallback) -> Result<()> {
        self.ensure_owner(id)?;
        let previous = lock(&self.android_callback).replace((call, callback));
        if let Some((displaced, _)) = previous {
            warn!(bridge = %id, displaced = %displaced, "androidCallback reassigned while a call was still waiting");
        }
        Ok(())
    }

    /// Empty the callback slot if it still belongs to `call`.
    pub fn release_android_callback(&self, id: BridgeId, call: CallId) {
        if self.ensure_owner(id).is_err() {
            return;
        }
        let mut slot = lock(&self.android_callback);
        if slot.as_ref().is_some_and(|(parked, _)| *parked == call) {
            slot.take();
        }
    }

    /// The call whose resolver is parked in the slot, if any.
    pub fn android_callback_owner(&self) -> Option<CallId> {
        lock(&self.android_callback).as_ref().map(|(call, _)| *call)
    }

    /// Host entry point: the Android side delivers an asynchronous result.
    ///
    /// Returns `false` when nothing was waiting.
    pub fn android_callback(&self, result: Value) -> bool {
        let callback = lock(&self.android_callback).take();
        match callback {
            Some((_, callback)) => {
                callback(result);
                true
            }
            None => {
                debug!("androidCallback fired with no call waiting");
                false
            }
        }
    }

    // -- fromWeb -------------------------------------------------------------

    /// Install the trigger the host invokes for `event`.
    pub fn install_event_trigger(&self, id: BridgeId, event: &str, trigger: EventTrigger) -> Result<()> {
        self.ensure_owner(id)?;
        lock(&self.from_web).insert(event.to_string(), trigger);
        Ok(())
    }

    /// Names currently present in the `fromWeb` namespace.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.from_web).keys().cloned().collect();
        names.sort();
        names
    }

    /// Host entry point: fire `fromWeb[event]()`. Unknown names are a no-op.
    pub fn from_web(&self, event: &str) -> bool {
        let trigger = lock(&self.from_web).get(event).cloned();
        match trigger {
            Some(trigger) => {
                trigger();
                true
            }
            None => {
                debug!(event, "fromWeb fired for an unregistered event");
                false
            }
        }
    }

    // -- iOS bridge readiness ------------------------------------------------

    /// Run `consumer` with the iOS bridge once it exists.
    ///
    /// The first consumer to arrive posts the injection request through
    /// `webkit`; later ones queue behind it. Every queued consumer runs
    /// exactly once when the host reports readiness.
    pub fn with_ios_bridge(&self, webkit: Option<&dyn WebkitChannel>, consumer: ReadyCallback) {
        let mut state = lock(&self.ios);
        match &mut *state {
            IosReadiness::Ready(handle) => {
                let handle = Arc::clone(handle);
                drop(state);
                consumer(handle);
            }
            IosReadiness::Waiting(queue) => queue.push(consumer),
            IosReadiness::Idle => {
                *state = IosReadiness::Waiting(vec![consumer]);
                drop(state);
                match webkit {
                    Some(channel) => {
                        debug!("requesting iOS bridge injection");
                        channel.request_bridge_injection();
                    }
                    None => warn!("iOS bridge requested but no webkit message channel is present"),
                }
            }
        }
    }

    /// Resolve with the iOS bridge handle once the host has injected it.
    ///
    /// Resolves to `None` only if the waiting list is discarded without the
    /// host ever becoming ready.
    pub async fn ios_bridge(&self, webkit: Option<&dyn WebkitChannel>) -> Option<Arc<dyn IosBridgeHandle>> {
        let (tx, rx) = oneshot::channel();
        self.with_ios_bridge(
            webkit,
            Box::new(move |handle| {
                let _ = tx.send(handle);
            }),
        );
        rx.await.ok()
    }

    /// Whether the host has already injected the iOS bridge.
    pub fn ios_ready(&self) -> bool {
        matches!(*lock(&self.ios), IosReadiness::Ready(_))
    }

    /// Host entry point: the iOS bridge is ready. Drains every queued
    /// consumer.
    pub fn ios_bridge_ready(&self, handle: Arc<dyn IosBridgeHandle>) {
        let previous = std::mem::replace(&mut *lock(&self.ios), IosReadiness::Ready(Arc::clone(&handle)));
        if let IosReadiness::Waiting(queue) = previous {
            info!(waiting = queue.len(), "iOS bridge ready");
            for consumer in queue {
                consumer(Arc::clone(&handle));
            }
        }
    }
}

/// Everything the bridge can see of its embedding host.
#[derive(Clone, Default)]
pub struct Host {
    /// `navigator.userAgent`, or `None` outside a browser.
    pub user_agent: Option<String>,
    /// The Android `fromAndroid` object, when injected.
    pub android: Option<Arc<dyn AndroidSurface>>,
    /// The `webkit.messageHandlers` channel, when present.
    pub webkit: Option<Arc<dyn WebkitChannel>>,
    pub slots: Arc<HostSlots>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("user_agent", &self.user_agent)
            .field("android", &self.android.is_some())
            .field("webkit", &self.webkit.is_some())
            .field("slots", &self.slots)
            .finish()
    }
}

impl Host {
    /// Plain browser or desktop: no native surfaces at all.
    pub fn desktop(user_agent: Option<String>) -> Self {
        Self {
            user_agent,
            ..Self::default()
        }
    }

    /// Android WebView with the given `fromAndroid` object.
    pub fn android(user_agent: impl Into<String>, surface: Arc<dyn AndroidSurface>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            android: Some(surface),
            ..Self::default()
        }
    }

    /// iOS WKWebView with the given injection channel.
    pub fn ios(user_agent: impl Into<String>, webkit: Arc<dyn WebkitChannel>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            webkit: Some(webkit),
            ..Self::default()
        }
    }

    pub fn detector(&self) -> PlatformDetector {
        PlatformDetector {
            user_agent: self.user_agent.clone(),
            has_android_object: self.android.is_some(),
            has_webkit: self.webkit.is_some(),
        }
    }
}
