//! Pending-request table
//!
//! Shared between the transport's event-loop thread, which appends rows and
//! completion signals, and the fetching thread, which waits on them. One mutex
//! guards every entry and one condition variable is notified on every
//! mutation, so waiters always re-check their predicate under the lock.
//!
//! Each registration carries a generation number. Draining through a
//! [`Registration`] only removes the entry it created, which keeps a stale
//! owner from clearing a newer fetch that reused the same id.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::{Bar, RequestId};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// When a waiting fetch is considered satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Wait for the stream-end signal
    #[default]
    UntilComplete,
    /// Return as soon as completion or a first row is observed
    FirstRow,
}

impl WaitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitPolicy::UntilComplete => "until_complete",
            WaitPolicy::FirstRow => "first_row",
        }
    }

    fn satisfied(&self, request: &PendingRequest) -> bool {
        match self {
            WaitPolicy::UntilComplete => request.completed,
            WaitPolicy::FirstRow => request.completed || !request.rows.is_empty(),
        }
    }
}

/// Why a pending request was terminated early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The gateway answered with an error event
    Gateway { code: i32, message: String },
    /// The session went away while the request was pending
    Disconnected,
}

/// One in-flight historical request
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: RequestId,
    /// Rows in arrival order
    pub rows: Vec<Bar>,
    pub completed: bool,
    pub failure: Option<RequestFailure>,
    pub created_at: Instant,
    generation: u64,
}

/// Proof of ownership returned by [`PendingRequestTable::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub request_id: RequestId,
    generation: u64,
}

/// Non-destructive view of a pending request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub rows: Vec<Bar>,
    pub completed: bool,
}

/// Result of [`PendingRequestTable::wait`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The policy was satisfied
    Ready,
    /// The deadline passed first
    TimedOut,
    /// The request was terminated
    Failed(RequestFailure),
    /// No such entry (never registered or already removed)
    Missing,
}

#[derive(Default)]
struct TableState {
    requests: HashMap<RequestId, PendingRequest>,
    next_generation: u64,
}

/// Concurrency-safe map from request id to its accumulating rows
#[derive(Default)]
pub struct PendingRequestTable {
    state: Mutex<TableState>,
    changed: Condvar,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty entry owned by the caller
    pub fn register(&self, request_id: RequestId) -> Result<Registration, BridgeError> {
        let mut state = self.state.lock();
        if state.requests.contains_key(&request_id) {
            return Err(BridgeError::RequestInFlight(request_id));
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        state.requests.insert(
            request_id,
            PendingRequest {
                request_id,
                rows: Vec::new(),
                completed: false,
                failure: None,
                created_at: Instant::now(),
                generation,
            },
        );

        Ok(Registration {
            request_id,
            generation,
        })
    }

    /// Register and wrap the registration in a guard that releases the
    /// entry on drop
    pub fn claim(&self, request_id: RequestId) -> Result<PendingGuard<'_>, BridgeError> {
        let registration = self.register(request_id)?;
        Ok(PendingGuard {
            table: self,
            registration,
            released: false,
        })
    }

    /// Append a row. Returns `false` when the id is not pending.
    pub fn append(&self, request_id: RequestId, row: Bar) -> bool {
        self.mutate(request_id, |request| request.rows.push(row))
    }

    /// Mark the stream finished. Returns `false` when the id is not pending.
    pub fn complete(&self, request_id: RequestId) -> bool {
        self.mutate(request_id, |request| request.completed = true)
    }

    /// Terminate one request. Returns `false` when the id is not pending.
    pub fn fail(&self, request_id: RequestId, failure: RequestFailure) -> bool {
        self.mutate(request_id, |request| {
            if request.failure.is_none() {
                request.failure = Some(failure);
            }
        })
    }

    /// Terminate every pending request and wake all waiters
    pub fn fail_all(&self, failure: RequestFailure) -> usize {
        let mut state = self.state.lock();
        let mut failed = 0;
        for request in state.requests.values_mut() {
            if request.failure.is_none() {
                request.failure = Some(failure.clone());
                failed += 1;
            }
        }
        drop(state);

        self.changed.notify_all();
        failed
    }

    pub fn snapshot(&self, request_id: RequestId) -> Option<RequestSnapshot> {
        self.state
            .lock()
            .requests
            .get(&request_id)
            .map(|request| RequestSnapshot {
                rows: request.rows.clone(),
                completed: request.completed,
            })
    }

    /// Remove an entry regardless of who owns it
    pub fn clear(&self, request_id: RequestId) -> Option<PendingRequest> {
        let removed = self.state.lock().requests.remove(&request_id);
        if removed.is_some() {
            self.changed.notify_all();
        }
        removed
    }

    /// Block until the policy is satisfied, the request is terminated or
    /// removed, or `timeout` elapses
    pub fn wait(&self, request_id: RequestId, policy: WaitPolicy, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            match state.requests.get(&request_id) {
                None => return WaitOutcome::Missing,
                Some(request) => {
                    if let Some(failure) = &request.failure {
                        return WaitOutcome::Failed(failure.clone());
                    }
                    if policy.satisfied(request) {
                        return WaitOutcome::Ready;
                    }
                }
            }

            if self.changed.wait_until(&mut state, deadline).timed_out() {
                // Last look: a mutation may have landed right at the deadline
                return match state.requests.get(&request_id) {
                    None => WaitOutcome::Missing,
                    Some(request) => match &request.failure {
                        Some(failure) => WaitOutcome::Failed(failure.clone()),
                        None if policy.satisfied(request) => WaitOutcome::Ready,
                        None => WaitOutcome::TimedOut,
                    },
                };
            }
        }
    }

    /// Remove the entry created by `registration` and return its rows.
    /// A newer entry under the same id is left untouched.
    pub fn release(&self, registration: Registration) -> Vec<Bar> {
        let mut state = self.state.lock();
        let owned = state
            .requests
            .get(&registration.request_id)
            .is_some_and(|request| request.generation == registration.generation);
        if !owned {
            return Vec::new();
        }

        let rows = state
            .requests
            .remove(&registration.request_id)
            .map(|request| request.rows)
            .unwrap_or_default();
        drop(state);

        self.changed.notify_all();
        rows
    }

    pub fn len(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().requests.is_empty()
    }

    fn mutate(&self, request_id: RequestId, apply: impl FnOnce(&mut PendingRequest)) -> bool {
        let mut state = self.state.lock();
        let Some(request) = state.requests.get_mut(&request_id) else {
            return false;
        };
        apply(request);
        drop(state);

        self.changed.notify_all();
        true
    }
}

/// Owns a registration and releases it on every exit path
pub struct PendingGuard<'a> {
    table: &'a PendingRequestTable,
    registration: Registration,
    released: bool,
}

impl PendingGuard<'_> {
    pub fn request_id(&self) -> RequestId {
        self.registration.request_id
    }

    /// Drain the rows and drop the entry
    pub fn release(mut self) -> Vec<Bar> {
        self.released = true;
        self.table.release(self.registration)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.table.release(self.registration);
        }
    }
}
