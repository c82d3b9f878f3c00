// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event hub for native-pushed application events (lifecycle, page
// visibility, share results).  The host fires an event by name through the
// `fromWeb` namespace; every listener registered for it runs, and a listener
// that panics is logged and skipped so it cannot block the others.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use malan_core::AppEvent;
use tracing::{debug, error};

use crate::lock;

/// Callback run when an event fires.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`EventHub::on`], used to remove that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-event listener sets.
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<HashMap<AppEvent, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` to `event`. Adding the same listener twice keeps one
    /// entry and returns its existing id.
    pub fn on(&self, event: AppEvent, listener: Listener) -> ListenerId {
        let mut listeners = lock(&self.listeners);
        let set = listeners.entry(event).or_default();
        if let Some((id, _)) = set.iter().find(|(_, existing)| same_listener(existing, &listener)) {
            return *id;
        }
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        set.push((id, listener));
        id
    }

    /// Remove one listener, or every listener of `event` when `id` is
    /// `None`. Returns how many were removed.
    pub fn off(&self, event: AppEvent, id: Option<ListenerId>) -> usize {
        let mut listeners = lock(&self.listeners);
        let Some(set) = listeners.get_mut(&event) else {
            return 0;
        };
        let before = set.len();
        match id {
            Some(id) => set.retain(|(existing, _)| *existing != id),
            None => set.clear(),
        }
        before - set.len()
    }

    /// Run every listener of `event`. Returns how many completed without
    /// panicking.
    pub fn emit(&self, event: AppEvent) -> usize {
        let snapshot: Vec<Listener> = lock(&self.listeners)
            .get(&event)
            .map(|set| set.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();
        if snapshot.is_empty() {
            return 0;
        }

        debug!(event = %event, listeners = snapshot.len(), "delivering app event");
        let mut delivered = 0;
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener())) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(event = %event, panic = %panic_message(payload.as_ref()), "event listener failed");
                }
            }
        }
        delivered
    }

    /// Deliver an event by its host name. Unrecognised names are ignored.
    pub fn emit_named(&self, name: &str) -> usize {
        match name.parse::<AppEvent>() {
            Ok(event) => self.emit(event),
            Err(_) => {
                debug!(event = name, "ignoring unrecognised app event");
                0
            }
        }
    }

    pub fn listener_count(&self, event: AppEvent) -> usize {
        lock(&self.listeners).get(&event).map_or(0, Vec::len)
    }

    /// Drop every listener of every event.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *lock(&self.listeners));
        drop(drained);
    }
}
