// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Malan Bridge: web-side client for the native bridges exposed by in-app
// WebViews.  iOS talks through a message-channel bridge (WKWebView), Android
// through a flat host-injected object whose functions are called
// synchronously.  Both are presented to callers as one asynchronous API that
// always resolves to a `CallResult`.
//
// The native sides are abstracted behind the traits in `traits`, and the
// process-wide host state (callback slot, event entry points, iOS readiness)
// lives in `host::HostSlots`.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod bridge;
pub mod dispatcher;
pub mod events;
pub mod host;
pub mod platform;
pub mod plugin;
pub mod queue;
pub mod registry;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use bridge::{Bridge, CallOptions, PendingCall, ResultCallback};
pub use dispatcher::normalize_result;
pub use events::{EventHub, Listener, ListenerId};
pub use host::{Host, HostSlots};
pub use platform::{Platform, PlatformInfo, PlatformDetector};
pub use plugin::PluginOptions;
pub use registry::MethodRegistry;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};

pub use malan_core::{AppEvent, BridgeConfig, BridgeError, CallResult, MethodConfig, PlatformType};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
///
/// Listener and native callbacks are never run while a lock is held, so a
/// poisoned guard still protects consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
