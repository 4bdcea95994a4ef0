//! Cycle audit trail.
//!
//! The publisher records one [`CycleEvent`] per tick when a sink is attached.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// What happened on a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleAction {
    /// Another cycle for the endpoint was in flight; nothing ran.
    Contended,
    /// `receive` returned no records.
    Idle,
    /// Records were processed and their statuses committed.
    Committed,
    /// The cycle aborted on a data-provider failure or panic.
    Failed(String),
}

/// One tick of one endpoint, as seen by the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEvent {
    /// Endpoint identifier.
    pub endpoint_id: String,
    /// Consumer-group label.
    pub group_id: String,
    /// Tick outcome.
    pub action: CycleAction,
    /// Statuses committed by the cycle.
    pub records: usize,
    /// Wall-clock time of the tick, in epoch milliseconds.
    pub at_ms: u128,
}

/// Destination for cycle events. Called from scheduling tasks, so
/// implementations must not block for long.
pub trait AuditSink: Send {
    /// Store or forward `event`.
    fn record(&mut self, event: CycleEvent);
}

/// Keeps the most recent `capacity` events; older ones are evicted first.
pub struct InMemoryAuditSink {
    recent: VecDeque<CycleEvent>,
    capacity: usize,
}

impl InMemoryAuditSink {
    /// Sink retaining at most `capacity` events. Zero retains nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<CycleEvent> {
        self.recent.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: CycleEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(event);
    }
}

/// Shared sinks let the caller keep a handle for inspection.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: CycleEvent) {
        self.lock().record(event);
    }
}

/// Stamp a [`CycleEvent`] with the current time.
pub fn build_cycle_event(
    endpoint_id: impl Into<String>,
    group_id: impl Into<String>,
    action: CycleAction,
    records: usize,
) -> CycleEvent {
    CycleEvent {
        endpoint_id: endpoint_id.into(),
        group_id: group_id.into(),
        action,
        records,
        at_ms: now_ms(),
    }
}
