//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use prometheus_stream_listener::config::StreamListenerConfig;
use prometheus_stream_listener::core::{
    AppResult, BatchListener, DataProvider, EventIdAware, ListenerErrorHandler, RecordListener,
    ResponseStatus, StreamListenerEndpoint,
};

/// Test record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub event_id: String,
}

impl EventIdAware for Event {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn id(&self) -> i64 {
        self.id
    }
}

pub fn event(id: i64) -> Event {
    Event {
        id,
        event_id: format!("evt-{id}"),
    }
}

pub fn events(ids: &[i64]) -> Vec<Event> {
    ids.iter().copied().map(event).collect()
}

pub fn config() -> StreamListenerConfig {
    StreamListenerConfig {
        topics: Some("orders".into()),
        ..StreamListenerConfig::default()
    }
}

/// Data provider serving queued batches, then empty ones.
#[derive(Default)]
pub struct InMemoryProvider {
    batches: Mutex<VecDeque<Vec<Event>>>,
    commits: Mutex<Vec<Vec<ResponseStatus>>>,
    receive_calls: AtomicUsize,
    receive_times: Mutex<Vec<Instant>>,
    failing_receives: AtomicUsize,
    failing_commits: AtomicUsize,
    receive_delay: Option<Duration>,
    endless: Option<Vec<Event>>,
}

impl InMemoryProvider {
    pub fn new(batches: Vec<Vec<Event>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        })
    }

    /// Provider whose `receive` takes `delay` before answering.
    pub fn slow(batches: Vec<Vec<Event>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            receive_delay: Some(delay),
            ..Self::default()
        })
    }

    /// Provider that answers every `receive` with a copy of `batch`.
    pub fn endless(batch: Vec<Event>) -> Arc<Self> {
        Arc::new(Self {
            endless: Some(batch),
            ..Self::default()
        })
    }

    pub fn push_batch(&self, batch: Vec<Event>) {
        self.batches.lock().push_back(batch);
    }

    /// Make the next `n` calls to `receive` fail.
    pub fn fail_next_receives(&self, n: usize) {
        self.failing_receives.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls to `commit` fail.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn commits(&self) -> Vec<Vec<ResponseStatus>> {
        self.commits.lock().clone()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    /// When each `receive` started.
    pub fn receive_times(&self) -> Vec<Instant> {
        self.receive_times.lock().clone()
    }

    /// Shortest spacing between two consecutive `receive` calls.
    pub fn min_receive_gap(&self) -> Option<Duration> {
        self.receive_times()
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .min()
    }
}

#[async_trait]
impl DataProvider<Event> for InMemoryProvider {
    async fn receive(&self, _endpoint: &StreamListenerEndpoint<Event>) -> AppResult<Vec<Event>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        self.receive_times.lock().push(Instant::now());
        if let Some(delay) = self.receive_delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .failing_receives
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("source unavailable");
        }
        if let Some(batch) = &self.endless {
            return Ok(batch.clone());
        }
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }

    async fn commit(
        &self,
        _endpoint: &StreamListenerEndpoint<Event>,
        statuses: Vec<ResponseStatus>,
    ) -> AppResult<()> {
        if self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("broker rejected the offsets");
        }
        self.commits.lock().push(statuses);
        Ok(())
    }
}

/// Record listener that fails on chosen ids and records every call.
#[derive(Default)]
pub struct RecordingListener {
    failing: HashSet<i64>,
    panicking: HashSet<i64>,
    calls: Mutex<Vec<i64>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(ids: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            failing: ids.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn panicking_on(ids: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            panicking: ids.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RecordListener<Event> for RecordingListener {
    async fn on_record(&self, record: &Event) -> AppResult<()> {
        self.calls.lock().push(record.id);
        if self.panicking.contains(&record.id) {
            panic!("listener exploded on {}", record.id);
        }
        if self.failing.contains(&record.id) {
            bail!("boom on {}", record.event_id);
        }
        Ok(())
    }
}

/// Batch listener that records every batch and optionally fails.
#[derive(Default)]
pub struct RecordingBatchListener {
    fail: bool,
    calls: Mutex<Vec<Vec<i64>>>,
}

impl RecordingBatchListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BatchListener<Event> for RecordingBatchListener {
    async fn on_batch(&self, records: &[Event]) -> AppResult<()> {
        self.calls
            .lock()
            .push(records.iter().map(|r| r.id).collect());
        if self.fail {
            bail!("batch rejected");
        }
        Ok(())
    }
}

/// Error handler remembering the ids it was called with.
#[derive(Default)]
pub struct RecordingErrorHandler {
    calls: Mutex<Vec<Vec<i64>>>,
}

impl RecordingErrorHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ListenerErrorHandler<Event> for RecordingErrorHandler {
    async fn handle_batch_error(
        &self,
        records: &[Event],
        error: &anyhow::Error,
        _endpoint: &StreamListenerEndpoint<Event>,
    ) -> Option<Value> {
        self.calls
            .lock()
            .push(records.iter().map(|r| r.id).collect());
        Some(Value::String(error.to_string()))
    }
}
