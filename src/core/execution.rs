//! One poll-and-process cycle for one endpoint.
//!
//! A cycle runs `receive -> filter -> invoke -> convert -> commit`. Listener
//! failures (errors or panics) are recovered per invocation and surface only as
//! `ERROR` statuses plus an optional error-handler call. Failures of the data
//! provider itself abort the cycle and propagate to the caller: there is no
//! partial commit to report.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::core::error::panic_message;
use crate::core::{
    AppResult, BatchListener, EventIdAware, FilterEvaluator, ListenerError, ListenerMethod,
    RecordListener, ResponseState, ResponseStatus, ResponseStatusConverter,
    StreamListenerEndpoint,
};

/// Status counts of a committed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// `OK` statuses.
    pub ok: usize,
    /// `ERROR` statuses.
    pub error: usize,
    /// `SKIPPED` statuses.
    pub skipped: usize,
}

impl CycleSummary {
    fn from_statuses(statuses: &[ResponseStatus]) -> Self {
        statuses
            .iter()
            .fold(Self::default(), |mut summary, status| {
                match status.state {
                    ResponseState::Ok => summary.ok += 1,
                    ResponseState::Error => summary.error += 1,
                    ResponseState::Skipped => summary.skipped += 1,
                }
                summary
            })
    }

    /// Total statuses committed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.error + self.skipped
    }
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `receive` returned nothing; no invocation, no commit.
    Idle,
    /// Records were processed and committed.
    Processed(CycleSummary),
}

impl CycleOutcome {
    /// Whether the scheduler should keep driving the endpoint.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

/// Runs cycles for endpoints of any record type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionService {
    converter: ResponseStatusConverter,
}

impl ExecutionService {
    /// Create a new execution service.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            converter: ResponseStatusConverter,
        }
    }

    /// Execute one cycle and report whether the endpoint had work.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Receive`] or [`ListenerError::Commit`] when the
    /// data provider fails; listener failures never produce an error here.
    pub async fn execute_cycle<T: EventIdAware>(
        &self,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> Result<bool, ListenerError> {
        self.run_cycle(endpoint)
            .await
            .map(|outcome| outcome.has_more())
    }

    /// Execute one cycle and report what it committed.
    ///
    /// # Errors
    ///
    /// See [`ExecutionService::execute_cycle`].
    pub async fn run_cycle<T: EventIdAware>(
        &self,
        endpoint: &StreamListenerEndpoint<T>,
    ) -> Result<CycleOutcome, ListenerError> {
        let endpoint_id = endpoint.id();
        let data_provider = endpoint.data_provider();

        let records = data_provider
            .receive(endpoint)
            .await
            .map_err(|source| ListenerError::Receive {
                endpoint: endpoint_id.to_string(),
                source,
            })?;

        if records.is_empty() {
            trace!(endpoint_id, "skip invocation due to empty records");
            return Ok(CycleOutcome::Idle);
        }

        trace!(endpoint_id, records = records.len(), "received records");

        let started = Instant::now();
        let statuses = match endpoint.method() {
            ListenerMethod::Batch(listener) => {
                self.execute_batch(endpoint, listener.as_ref(), &records)
                    .await
            }
            ListenerMethod::Record(listener) => {
                self.execute_records(endpoint, listener.as_ref(), &records)
                    .await
            }
        };

        debug_assert_eq!(statuses.len(), records.len());
        let summary = CycleSummary::from_statuses(&statuses);

        debug!(
            endpoint_id,
            records = records.len(),
            ok = summary.ok,
            error = summary.error,
            skipped = summary.skipped,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "invocation completed"
        );

        let count = statuses.len();
        data_provider
            .commit(endpoint, statuses)
            .await
            .map_err(|source| ListenerError::Commit {
                endpoint: endpoint_id.to_string(),
                records: count,
                source,
            })?;

        Ok(CycleOutcome::Processed(summary))
    }

    async fn execute_batch<T: EventIdAware>(
        &self,
        endpoint: &StreamListenerEndpoint<T>,
        listener: &dyn BatchListener<T>,
        records: &[T],
    ) -> Vec<ResponseStatus> {
        let evaluator = FilterEvaluator::new(endpoint.record_filter());
        let filtered = evaluator.filter_batch(records);
        let mut statuses = filtered.skipped;
        let kept = filtered.records;

        if kept.is_empty() {
            trace!(endpoint_id = endpoint.id(), "every record filtered, skip invocation");
            return statuses;
        }

        match invoke(listener.on_batch(&kept)).await {
            Ok(()) => statuses.extend(self.converter.convert_list(&kept)),
            Err(error) => {
                warn!(
                    endpoint_id = endpoint.id(),
                    records = kept.len(),
                    error = %format!("{error:#}"),
                    "batch listener failed"
                );
                if let Some(handler) = endpoint.error_handler() {
                    let reply = handler.handle_batch_error(records, &error, endpoint).await;
                    trace!(endpoint_id = endpoint.id(), ?reply, "error handler returned");
                }
                let message = format!(
                    "Unable to execute endpoint [{}] within ({}) record(s). Message: {error:#}",
                    endpoint.id(),
                    kept.len()
                );
                statuses.extend(self.converter.convert_list_with_error(&kept, &message));
            }
        }

        statuses
    }

    async fn execute_records<T: EventIdAware>(
        &self,
        endpoint: &StreamListenerEndpoint<T>,
        listener: &dyn RecordListener<T>,
        records: &[T],
    ) -> Vec<ResponseStatus> {
        let evaluator = FilterEvaluator::new(endpoint.record_filter());
        let mut statuses = Vec::with_capacity(records.len());

        for record in records {
            if let Some(skipped) = evaluator.filter_record(record) {
                statuses.push(skipped);
                continue;
            }

            match invoke(listener.on_record(record)).await {
                Ok(()) => statuses.push(self.converter.convert(record)),
                Err(error) => {
                    warn!(
                        endpoint_id = endpoint.id(),
                        event_id = record.event_id(),
                        error = %format!("{error:#}"),
                        "record listener failed"
                    );
                    if let Some(handler) = endpoint.error_handler() {
                        let reply = handler.handle_record_error(record, &error, endpoint).await;
                        trace!(endpoint_id = endpoint.id(), ?reply, "error handler returned");
                    }
                    let message = format!(
                        "Unable to execute endpoint [{}] record [{}]. Message: {error:#}",
                        endpoint.id(),
                        record.event_id()
                    );
                    statuses.push(self.converter.convert_with_error(record, message));
                }
            }
        }

        statuses
    }
}

/// Await a listener call, turning a panic into an ordinary failure.
async fn invoke<F>(call: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(
            "listener panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}
