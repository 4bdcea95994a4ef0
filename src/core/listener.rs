//! Collaborator contracts implemented by application code.
//!
//! A registered endpoint wires together a [`DataProvider`] that pulls records
//! and commits acknowledgements, a listener that consumes either single
//! records ([`RecordListener`]) or whole batches ([`BatchListener`]), and the
//! optional [`RecordFilter`], [`ListenerErrorHandler`] and [`RecordConverter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use prometheus_stream_listener::core::{RecordListener, StreamListenerEndpoint};
//!
//! struct OrderListener;
//!
//! #[async_trait]
//! impl RecordListener<OrderEvent> for OrderListener {
//!     async fn on_record(&self, record: &OrderEvent) -> anyhow::Result<()> {
//!         tracing::info!(order = record.id, "order received");
//!         Ok(())
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::{AppResult, EventIdAware, ResponseStatus, StreamListenerEndpoint};

/// Source of records for an endpoint.
///
/// `receive` may return an empty batch and must not block indefinitely;
/// implementations apply their own timeouts. `commit` is called exactly once
/// per non-empty `receive` with one status per received record.
#[async_trait]
pub trait DataProvider<T: EventIdAware>: Send + Sync {
    /// Pull the next batch of records for `endpoint`.
    async fn receive(&self, endpoint: &StreamListenerEndpoint<T>) -> AppResult<Vec<T>>;

    /// Acknowledge the records of the last batch.
    async fn commit(
        &self,
        endpoint: &StreamListenerEndpoint<T>,
        statuses: Vec<ResponseStatus>,
    ) -> AppResult<()>;
}

/// Listener invoked once per record.
#[async_trait]
pub trait RecordListener<T: EventIdAware>: Send + Sync {
    /// Process a single record. An error marks the record as failed.
    async fn on_record(&self, record: &T) -> AppResult<()>;
}

/// Listener invoked once per (filtered) batch.
#[async_trait]
pub trait BatchListener<T: EventIdAware>: Send + Sync {
    /// Process a batch. An error marks every record of the batch as failed.
    async fn on_batch(&self, records: &[T]) -> AppResult<()>;
}

/// The listener registered for an endpoint; its variant decides batch mode.
pub enum ListenerMethod<T: EventIdAware> {
    /// Single-record listener.
    Record(Arc<dyn RecordListener<T>>),
    /// Batch listener.
    Batch(Arc<dyn BatchListener<T>>),
}

impl<T: EventIdAware> ListenerMethod<T> {
    /// Wrap a single-record listener.
    pub fn record(listener: impl RecordListener<T> + 'static) -> Self {
        Self::Record(Arc::new(listener))
    }

    /// Wrap a batch listener.
    pub fn batch(listener: impl BatchListener<T> + 'static) -> Self {
        Self::Batch(Arc::new(listener))
    }

    /// True for batch listeners.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl<T: EventIdAware> Clone for ListenerMethod<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Record(listener) => Self::Record(Arc::clone(listener)),
            Self::Batch(listener) => Self::Batch(Arc::clone(listener)),
        }
    }
}

/// Decides whether a record is discarded before invocation.
pub trait RecordFilter<T>: Send + Sync {
    /// Return true if the record should be discarded.
    fn discard(&self, record: &T) -> bool;
}

impl<T, F> RecordFilter<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn discard(&self, record: &T) -> bool {
        self(record)
    }
}

/// Called after a listener failure, before the `ERROR` statuses are built.
///
/// The returned value is informational only; the engine logs it and carries on.
#[async_trait]
pub trait ListenerErrorHandler<T: EventIdAware>: Send + Sync {
    /// Handle a failure of a single-record listener.
    async fn handle_record_error(
        &self,
        record: &T,
        error: &anyhow::Error,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> Option<Value> {
        self.handle_batch_error(std::slice::from_ref(record), error, endpoint)
            .await
    }

    /// Handle a failure of a batch listener.
    async fn handle_batch_error(
        &self,
        records: &[T],
        error: &anyhow::Error,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> Option<Value>;
}

/// Maps a raw JSON object into a typed record.
///
/// Carried on the endpoint for data providers; the engine itself never
/// converts record content.
pub trait RecordConverter<T: EventIdAware>: Send + Sync {
    /// Build a record from its raw representation.
    fn convert(
        &self,
        raw: &Map<String, Value>,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> AppResult<T>;
}

/// [`RecordConverter`] backed by `serde_json` deserialization.
pub struct JsonRecordConverter<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonRecordConverter<T> {
    /// Create a converter for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for JsonRecordConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordConverter<T> for JsonRecordConverter<T>
where
    T: EventIdAware + DeserializeOwned,
{
    fn convert(
        &self,
        raw: &Map<String, Value>,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> AppResult<T> {
        serde_json::from_value(Value::Object(raw.clone())).map_err(|e| {
            anyhow::anyhow!(
                "unable to convert record for endpoint [{}] topic [{}]: {e}",
                endpoint.id(),
                endpoint.topic()
            )
        })
    }
}
