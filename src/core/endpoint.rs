//! Endpoint descriptor: one registered consumer and its scheduling policy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::cron::CronSchedule;
use crate::core::{
    DataProvider, EventIdAware, ListenerErrorHandler, ListenerMethod, RecordConverter,
    RecordFilter,
};

/// What a continuous endpoint does once a cycle finds no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Stop driving the endpoint; it needs an explicit trigger to run again.
    #[default]
    Drain,
    /// Sleep the fixed delay and keep polling until shutdown.
    Poll,
}

/// How the publisher re-arms an endpoint after each cycle.
#[derive(Debug, Clone)]
pub enum RearmPolicy {
    /// Drive loop: cycle, sleep the delay, cycle again while work remains.
    Continuous {
        /// Behaviour once the endpoint runs dry.
        idle: IdlePolicy,
    },
    /// Cron ticks, plus a fixed-delay re-arm while work remains.
    Cron(CronSchedule),
    /// Fixed-delay timer chain that never stops on its own.
    FixedDelay,
}

impl RearmPolicy {
    /// Short label used in logs and snapshots.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Continuous { .. } => "continuous",
            Self::Cron(_) => "cron",
            Self::FixedDelay => "fixed_delay",
        }
    }
}

/// Resolved, concrete settings for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    /// Unique endpoint identifier (concurrency-guard key).
    pub id: String,
    /// Consumer-group label, informational.
    pub group_id: String,
    /// Source identifier.
    pub topic: String,
    /// Continuous mode when true, timer/cron re-arm otherwise.
    pub auto_startup: bool,
    /// Informational concurrency flag, logged at registration.
    pub concurrency: bool,
    /// Minimum spacing between successive polls.
    pub delay: Duration,
    /// Cron expression for timer mode; `None` selects the fixed-delay timer.
    pub cron: Option<CronSchedule>,
    /// Idle behaviour in continuous mode.
    pub idle_policy: IdlePolicy,
    /// Consumer properties handed to data providers.
    pub properties: BTreeMap<String, String>,
}

/// One registered consumer: settings plus its collaborators.
///
/// Immutable once built; the publisher shares it read-only for the process
/// lifetime.
pub struct StreamListenerEndpoint<T: EventIdAware> {
    settings: EndpointSettings,
    record_type: &'static str,
    method: ListenerMethod<T>,
    data_provider: Arc<dyn DataProvider<T>>,
    record_filter: Option<Arc<dyn RecordFilter<T>>>,
    record_converter: Option<Arc<dyn RecordConverter<T>>>,
    error_handler: Option<Arc<dyn ListenerErrorHandler<T>>>,
}

impl<T: EventIdAware> StreamListenerEndpoint<T> {
    /// Assemble an endpoint from resolved settings and its collaborators.
    ///
    /// Prefer [`crate::builders::EndpointBuilder`], which resolves defaults and
    /// validates configuration first.
    pub fn new(
        settings: EndpointSettings,
        method: ListenerMethod<T>,
        data_provider: Arc<dyn DataProvider<T>>,
    ) -> Self {
        Self {
            settings,
            record_type: std::any::type_name::<T>(),
            method,
            data_provider,
            record_filter: None,
            record_converter: None,
            error_handler: None,
        }
    }

    /// Attach a record filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn RecordFilter<T>>) -> Self {
        self.record_filter = Some(filter);
        self
    }

    /// Attach a record converter.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn RecordConverter<T>>) -> Self {
        self.record_converter = Some(converter);
        self
    }

    /// Attach an error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ListenerErrorHandler<T>>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Endpoint identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.settings.id
    }

    /// Consumer-group label.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.settings.group_id
    }

    /// Source identifier.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.settings.topic
    }

    /// Type name of the records this endpoint consumes.
    #[must_use]
    pub const fn record_type(&self) -> &'static str {
        self.record_type
    }

    /// Whether the listener consumes whole batches.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        self.method.is_batch()
    }

    /// Whether the endpoint runs in continuous mode.
    #[must_use]
    pub const fn is_auto_startup(&self) -> bool {
        self.settings.auto_startup
    }

    /// Informational concurrency flag.
    #[must_use]
    pub const fn is_concurrency(&self) -> bool {
        self.settings.concurrency
    }

    /// Minimum spacing between successive polls.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.settings.delay
    }

    /// Cron schedule, when timer mode uses one.
    #[must_use]
    pub const fn cron(&self) -> Option<&CronSchedule> {
        self.settings.cron.as_ref()
    }

    /// Consumer properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.settings.properties
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    /// Registered listener.
    #[must_use]
    pub const fn method(&self) -> &ListenerMethod<T> {
        &self.method
    }

    /// Data provider.
    #[must_use]
    pub fn data_provider(&self) -> &dyn DataProvider<T> {
        self.data_provider.as_ref()
    }

    /// Record filter, if configured.
    #[must_use]
    pub fn record_filter(&self) -> Option<&dyn RecordFilter<T>> {
        self.record_filter.as_deref()
    }

    /// Record converter, if configured.
    #[must_use]
    pub fn record_converter(&self) -> Option<&dyn RecordConverter<T>> {
        self.record_converter.as_deref()
    }

    /// Error handler, if configured.
    #[must_use]
    pub fn error_handler(&self) -> Option<&dyn ListenerErrorHandler<T>> {
        self.error_handler.as_deref()
    }

    /// Re-arm policy derived from the auto-startup flag and cron setting.
    #[must_use]
    pub fn rearm_policy(&self) -> RearmPolicy {
        if self.settings.auto_startup {
            return RearmPolicy::Continuous {
                idle: self.settings.idle_policy,
            };
        }
        self.settings
            .cron
            .clone()
            .map_or(RearmPolicy::FixedDelay, RearmPolicy::Cron)
    }
}

impl<T: EventIdAware> fmt::Debug for StreamListenerEndpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamListenerEndpoint")
            .field("id", &self.settings.id)
            .field("group_id", &self.settings.group_id)
            .field("topic", &self.settings.topic)
            .field("record_type", &self.record_type)
            .field("batch", &self.is_batch())
            .field("policy", &self.rearm_policy().label())
            .field("delay", &self.settings.delay)
            .finish_non_exhaustive()
    }
}
