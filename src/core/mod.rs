//! Core listener abstractions, cycle execution and scheduling.

pub mod audit;
pub mod converter;
pub mod cron;
pub mod endpoint;
pub mod error;
pub mod execution;
pub mod filter;
pub mod guard;
pub mod listener;
pub mod publisher;
pub mod record;
pub mod stats;
pub mod status;

pub use audit::{build_cycle_event, AuditSink, CycleAction, CycleEvent, InMemoryAuditSink};
pub use converter::ResponseStatusConverter;
pub use cron::CronSchedule;
pub use endpoint::{EndpointSettings, IdlePolicy, RearmPolicy, StreamListenerEndpoint};
pub use error::{AppResult, ListenerError};
pub use execution::{CycleOutcome, CycleSummary, ExecutionService};
pub use filter::{FilterEvaluator, FilteredBatch};
pub use guard::{ConcurrencyGuard, GuardPermit};
pub use listener::{
    BatchListener, DataProvider, JsonRecordConverter, ListenerErrorHandler, ListenerMethod,
    RecordConverter, RecordFilter, RecordListener,
};
pub use publisher::{Spawn, StreamEventPublisher, TickOutcome};
pub use record::EventIdAware;
pub use stats::ListenerStats;
pub use status::{ResponseState, ResponseStatus};
