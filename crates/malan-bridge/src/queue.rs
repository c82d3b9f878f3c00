// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-flight call queue and the table of calls awaiting a native reply.
//
// Android exposes one shared `androidCallback` slot, so two overlapping
// asynchronous calls would race for it.  `CallQueue` admits one call at a
// time in submission order.  Submission never blocks: it hands back an
// admission receiver that the pending call awaits.  The slot is released
// when the admitted call's `Turn` is dropped, which happens whether the call
// settled normally, timed out, or was abandoned by its caller.
//
// `PendingCalls` holds the resolver of every call handed to native code and
// not yet answered, so timeouts and bulk cancellation can fail them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use malan_core::{BridgeError, CallId, CallResult};
use tracing::{debug, info, warn};

use crate::lock;

/// Answer to a queued call waiting for its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call may dispatch now.
    Proceed,
    /// The queue was cleared before the call's turn came.
    Cleared,
}

struct QueueItem {
    id: CallId,
    method: String,
    submitted_at: Instant,
    admit: oneshot::Sender<Admission>,
}

#[derive(Default)]
struct QueueState {
    waiting: VecDeque<QueueItem>,
    in_flight: Option<CallId>,
    /// Bumped by every `clear`.
    generation: u64,
}

/// FIFO queue admitting at most one call to native code at a time.
#[derive(Default)]
pub struct CallQueue {
    state: Mutex<QueueState>,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a call. It is admitted immediately when the queue is idle.
    ///
    /// The returned `Turn` must be kept alive for as long as the call owns
    /// (or waits for) the slot.
    pub fn submit(self: &Arc<Self>, id: CallId, method: &str) -> (Turn, oneshot::Receiver<Admission>) {
        let (admit, admission) = oneshot::channel();
        let mut state = lock(&self.state);
        state.waiting.push_back(QueueItem {
            id,
            method: method.to_string(),
            submitted_at: Instant::now(),
            admit,
        });
        if state.in_flight.is_none() {
            Self::advance(&mut state);
        } else {
            debug!(call = %id, method, queued = state.waiting.len(), "call queued");
        }
        drop(state);

        let turn = Turn {
            queue: Arc::clone(self),
            id,
        };
        (turn, admission)
    }

    /// Admit the next live item. Items whose caller went away are skipped.
    fn advance(state: &mut QueueState) {
        while let Some(item) = state.waiting.pop_front() {
            let waited = item.submitted_at.elapsed();
            if item.admit.send(Admission::Proceed).is_ok() {
                debug!(call = %item.id, method = %item.method, waited = ?waited, "call admitted");
                state.in_flight = Some(item.id);
                return;
            }
        }
        state.in_flight = None;
    }

    /// Remove `id` from the queue, handing the slot on if it held it.
    fn withdraw(&self, id: CallId) {
        let mut state = lock(&self.state);
        if state.in_flight == Some(id) {
            Self::advance(&mut state);
        } else {
            state.waiting.retain(|item| item.id != id);
        }
    }

    /// Fail every waiting call and reset to idle. Returns how many calls
    /// (waiting plus in-flight) were cancelled.
    pub fn clear(&self) -> usize {
        let mut state = lock(&self.state);
        let waiting: Vec<QueueItem> = state.waiting.drain(..).collect();
        let in_flight = state.in_flight.take();
        state.generation = state.generation.wrapping_add(1);
        drop(state);

        for item in &waiting {
            debug!(call = %item.id, method = %item.method, "queued call cleared");
        }
        let cleared = waiting.len() + usize::from(in_flight.is_some());
        for item in waiting {
            let _ = item.admit.send(Admission::Cleared);
        }
        cleared
    }

    /// Calls waiting for their turn (excluding the one in flight).
    pub fn len(&self) -> usize {
        lock(&self.state).waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No call in flight and none waiting.
    pub fn is_idle(&self) -> bool {
        let state = lock(&self.state);
        state.in_flight.is_none() && state.waiting.is_empty()
    }

    pub fn in_flight(&self) -> Option<CallId> {
        lock(&self.state).in_flight
    }

    /// Changes whenever the queue is cleared. A call that captured an older
    /// value has been cancelled, even if it was already admitted.
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }
}

/// A call's claim on the queue. Dropping it withdraws the call and, if it
/// was in flight, admits the next one.
#[must_use = "dropping a Turn releases the queue slot"]
pub struct Turn {
    queue: Arc<CallQueue>,
    id: CallId,
}

impl Turn {
    pub fn id(&self) -> CallId {
        self.id
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.queue.withdraw(self.id);
    }
}

struct CallbackInfo {
    resolver: oneshot::Sender<CallResult>,
    registered_at: Instant,
}

/// Resolvers of calls handed to native code and awaiting a reply.
#[derive(Default)]
pub struct PendingCalls {
    entries: Mutex<HashMap<CallId, CallbackInfo>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `id`'s reply.
    pub fn register(&self, id: CallId) -> oneshot::Receiver<CallResult> {
        let (resolver, reply) = oneshot::channel();
        lock(&self.entries).insert(
            id,
            CallbackInfo {
                resolver,
                registered_at: Instant::now(),
            },
        );
        reply
    }

    /// Deliver `result` to `id`. Returns `false` if `id` is no longer
    /// waiting (already answered, timed out, or cleared).
    pub fn resolve(&self, id: CallId, result: CallResult) -> bool {
        let entry = lock(&self.entries).remove(&id);
        match entry {
            Some(info) => info.resolver.send(result).is_ok(),
            None => {
                debug!(call = %id, "late native reply dropped");
                false
            }
        }
    }

    /// Whether `id` is still waiting for its reply.
    pub fn contains(&self, id: CallId) -> bool {
        lock(&self.entries).contains_key(&id)
    }

    /// Stop waiting for `id` without answering it.
    pub fn forget(&self, id: CallId) -> bool {
        lock(&self.entries).remove(&id).is_some()
    }

    /// Fail every entry older than `timeout`. Returns how many expired.
    pub fn sweep_expired(&self, timeout: Duration) -> usize {
        let expired: Vec<(CallId, CallbackInfo)> = {
            let mut entries = lock(&self.entries);
            let ids: Vec<CallId> = entries
                .iter()
                .filter(|(_, info)| info.registered_at.elapsed() >= timeout)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| entries.remove(&id).map(|info| (id, info)))
                .collect()
        };

        for (id, info) in &expired {
            warn!(call = %id, waited = ?info.registered_at.elapsed(), "native reply timed out");
        }
        let count = expired.len();
        for (_, info) in expired {
            let _ = info.resolver.send(CallResult::from(BridgeError::Timeout));
        }
        count
    }

    /// Fail every entry with `err`'s message.
    pub fn fail_all(&self, err: BridgeError) -> usize {
        let drained: Vec<CallbackInfo> = lock(&self.entries).drain().map(|(_, info)| info).collect();
        let message = err.to_string();
        if !drained.is_empty() {
            info!(count = drained.len(), reason = %message, "failing pending native calls");
        }
        let count = drained.len();
        for info in drained {
            let _ = info.resolver.send(CallResult::failure(message.clone()));
        }
        count
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    #[test]
    fn idle_queue_admits_immediately() {
        let queue = Arc::new(CallQueue::new());
        let (turn, mut admission) = queue.submit(CallId::new(), "getUserInfo");

        assert_eq!(admission.try_recv().expect("not cancelled"), Some(Admission::Proceed));
        assert_eq!(queue.in_flight(), Some(turn.id()));
        drop(turn);
        assert!(queue.is_idle());
    }

    #[test]
    fn second_call_waits_for_first() {
        let queue = Arc::new(CallQueue::new());
        let (first, _first_admission) = queue.submit(CallId::new(), "a");
        let (second, mut second_admission) = queue.submit(CallId::new(), "b");

        assert_eq!(second_admission.try_recv().expect("alive"), None);
        assert_eq!(queue.len(), 1);

        drop(first);
        assert_eq!(second_admission.try_recv().expect("alive"), Some(Admission::Proceed));
        assert_eq!(queue.in_flight(), Some(second.id()));
    }

    #[test]
    fn abandoned_waiter_is_skipped() {
        let queue = Arc::new(CallQueue::new());
        let (first, _a) = queue.submit(CallId::new(), "a");
        let (abandoned, abandoned_admission) = queue.submit(CallId::new(), "b");
        let (third, mut third_admission) = queue.submit(CallId::new(), "c");

        drop(abandoned_admission);
        drop(abandoned);
        assert_eq!(queue.len(), 1);

        drop(first);
        assert_eq!(third_admission.try_recv().expect("alive"), Some(Admission::Proceed));
        assert_eq!(queue.in_flight(), Some(third.id()));
    }

    #[test]
    fn clear_cancels_waiters_and_resets() {
        let queue = Arc::new(CallQueue::new());
        let (first, _a) = queue.submit(CallId::new(), "a");
        let (_second, mut second_admission) = queue.submit(CallId::new(), "b");

        assert_eq!(queue.clear(), 2);
        assert_eq!(second_admission.try_recv().expect("sent"), Some(Admission::Cleared));
        assert!(queue.is_idle());

        // The stale in-flight turn must not disturb calls submitted later.
        let (fresh, mut fresh_admission) = queue.submit(CallId::new(), "c");
        drop(first);
        assert_eq!(fresh_admission.try_recv().expect("alive"), Some(Admission::Proceed));
        assert_eq!(queue.in_flight(), Some(fresh.id()));
    }

    #[test]
    fn clear_moves_to_a_new_generation() {
        let queue = Arc::new(CallQueue::new());
        let before = queue.generation();
        let (_head, mut head_admission) = queue.submit(CallId::new(), "a");
        // Admitted at submit time, so the admission itself cannot be revoked.
        assert_eq!(head_admission.try_recv().expect("alive"), Some(Admission::Proceed));

        queue.clear();
        assert_ne!(queue.generation(), before);

        let after = queue.generation();
        queue.clear();
        assert_ne!(queue.generation(), after);
    }

    #[test]
    fn pending_tracks_membership() {
        let pending = PendingCalls::new();
        let id = CallId::new();
        assert!(!pending.contains(id));
        let _reply = pending.register(id);
        assert!(pending.contains(id));
        pending.resolve(id, CallResult::ok(None));
        assert!(!pending.contains(id));
    }

    #[test]
    fn pending_resolves_exactly_once() {
        let pending = PendingCalls::new();
        let id = CallId::new();
        let reply = pending.register(id);

        assert!(pending.resolve(id, CallResult::ok(Some(json!(1)))));
        assert!(!pending.resolve(id, CallResult::ok(Some(json!(2)))));

        let result = reply.now_or_never().expect("ready").expect("sent");
        assert_eq!(result.data, Some(json!(1)));
    }

    #[test]
    fn sweep_fails_only_expired_entries() {
        let pending = PendingCalls::new();
        let old = pending.register(CallId::new());
        std::thread::sleep(Duration::from_millis(30));
        let fresh = pending.register(CallId::new());

        assert_eq!(pending.sweep_expired(Duration::from_millis(20)), 1);
        assert_eq!(pending.len(), 1);

        let result = old.now_or_never().expect("ready").expect("sent");
        assert_eq!(result.error.as_deref(), Some("Call timeout"));
        drop(fresh);
    }

    #[test]
    fn fail_all_uses_error_message() {
        let pending = PendingCalls::new();
        let a = pending.register(CallId::new());
        let b = pending.register(CallId::new());

        assert_eq!(pending.fail_all(BridgeError::QueueCleared), 2);
        for reply in [a, b] {
            let result = reply.now_or_never().expect("ready").expect("sent");
            assert_eq!(result, CallResult::failure("Queue cleared"));
        }
        assert!(pending.is_empty());
    }
}
