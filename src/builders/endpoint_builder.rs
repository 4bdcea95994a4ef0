//! Builders to construct endpoints and publishers from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::{resolve_settings, EndpointOptions, StreamListenerConfig};
use crate::core::{
    BatchListener, DataProvider, EventIdAware, IdlePolicy, ListenerError, ListenerErrorHandler,
    ListenerMethod, RecordConverter, RecordFilter, RecordListener, StreamEventPublisher,
    StreamListenerEndpoint,
};
use crate::runtime::{ListenerRuntime, TokioSpawner};

/// Collects an endpoint's collaborators and options, then resolves and
/// validates them against the process defaults in [`EndpointBuilder::build`].
///
/// ```rust,ignore
/// let endpoint = EndpointBuilder::new("orderListener")
///     .topic("orders")
///     .auto_startup(true)
///     .record_listener(OrderListener)
///     .data_provider(provider)
///     .filter(|order: &OrderEvent| order.cancelled)
///     .build(&config)?;
/// publisher.register(endpoint)?;
/// ```
pub struct EndpointBuilder<T: EventIdAware> {
    name: String,
    options: EndpointOptions,
    method: Option<ListenerMethod<T>>,
    data_provider: Option<Arc<dyn DataProvider<T>>>,
    filter: Option<Arc<dyn RecordFilter<T>>>,
    converter: Option<Arc<dyn RecordConverter<T>>>,
    error_handler: Option<Arc<dyn ListenerErrorHandler<T>>>,
}

impl<T: EventIdAware> EndpointBuilder<T> {
    /// Start a builder for the listener registered as `name`. The name seeds
    /// the generated id when no explicit id is configured.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: EndpointOptions::default(),
            method: None,
            data_provider: None,
            filter: None,
            converter: None,
            error_handler: None,
        }
    }

    /// Replace all explicit options at once.
    #[must_use]
    pub fn options(mut self, options: EndpointOptions) -> Self {
        self.options = options;
        self
    }

    /// Explicit endpoint id, used verbatim.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.options.id = Some(id.into());
        self
    }

    /// Consumer-group label.
    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.options.group_id = Some(group_id.into());
        self
    }

    /// Topic to consume.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.options.topics = Some(topic.into());
        self
    }

    /// Delay between polls.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Continuous mode when true, timer/cron mode otherwise.
    #[must_use]
    pub fn auto_startup(mut self, auto_startup: bool) -> Self {
        self.options.auto_startup = Some(auto_startup);
        self
    }

    /// Informational concurrency flag.
    #[must_use]
    pub fn concurrency(mut self, concurrency: bool) -> Self {
        self.options.concurrency = Some(concurrency);
        self
    }

    /// Cron expression for timer mode; `-` selects the fixed-delay timer.
    #[must_use]
    pub fn cron(mut self, cron: impl Into<String>) -> Self {
        self.options.cron = Some(cron.into());
        self
    }

    /// Idle behaviour in continuous mode.
    #[must_use]
    pub fn idle_policy(mut self, idle_policy: IdlePolicy) -> Self {
        self.options.idle_policy = Some(idle_policy);
        self
    }

    /// Append a consumer properties payload.
    #[must_use]
    pub fn properties(mut self, payload: impl Into<String>) -> Self {
        self.options.properties.push(payload.into());
        self
    }

    /// Handle records one at a time.
    #[must_use]
    pub fn record_listener(mut self, listener: impl RecordListener<T> + 'static) -> Self {
        self.method = Some(ListenerMethod::record(listener));
        self
    }

    /// Handle whole batches.
    #[must_use]
    pub fn batch_listener(mut self, listener: impl BatchListener<T> + 'static) -> Self {
        self.method = Some(ListenerMethod::batch(listener));
        self
    }

    /// Use an already wrapped listener.
    #[must_use]
    pub fn listener(mut self, method: ListenerMethod<T>) -> Self {
        self.method = Some(method);
        self
    }

    /// Source of records.
    #[must_use]
    pub fn data_provider(mut self, provider: Arc<dyn DataProvider<T>>) -> Self {
        self.data_provider = Some(provider);
        self
    }

    /// Records for which `filter` returns true are skipped.
    #[must_use]
    pub fn filter(mut self, filter: impl RecordFilter<T> + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Raw-record converter carried for data providers.
    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn RecordConverter<T>>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Hook called when the listener fails.
    #[must_use]
    pub fn error_handler(mut self, handler: Arc<dyn ListenerErrorHandler<T>>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Resolve settings against `defaults` and assemble the endpoint.
    ///
    /// # Errors
    ///
    /// - [`ListenerError::Misconfiguration`] for a missing listener, data
    ///   provider or topic, a `batch` option that contradicts the listener
    ///   kind, or an ambiguous properties payload
    /// - [`ListenerError::InvalidCron`] for an unparsable cron expression
    pub fn build(
        self,
        defaults: &StreamListenerConfig,
    ) -> Result<StreamListenerEndpoint<T>, ListenerError> {
        let method = self.method.ok_or_else(|| {
            ListenerError::misconfigured(format!("listener [{}] has no handler", self.name))
        })?;
        let data_provider = self.data_provider.ok_or_else(|| {
            ListenerError::misconfigured(format!("listener [{}] has no data provider", self.name))
        })?;

        if let Some(batch) = self.options.batch {
            if batch != method.is_batch() {
                return Err(ListenerError::misconfigured(format!(
                    "listener [{}] is declared batch={batch} but its handler is {}",
                    self.name,
                    if method.is_batch() { "a batch listener" } else { "a record listener" }
                )));
            }
        }

        let settings = resolve_settings(&self.name, &self.options, defaults)?;
        let mut endpoint = StreamListenerEndpoint::new(settings, method, data_provider);
        if let Some(filter) = self.filter {
            endpoint = endpoint.with_filter(filter);
        }
        if let Some(converter) = self.converter {
            endpoint = endpoint.with_converter(converter);
        }
        if let Some(handler) = self.error_handler {
            endpoint = endpoint.with_error_handler(handler);
        }
        Ok(endpoint)
    }
}

/// Build a publisher driven by a dedicated runtime of
/// `config.worker_threads` threads.
///
/// # Errors
///
/// Returns [`ListenerError::Misconfiguration`] when the configuration is
/// invalid or the runtime cannot be created.
pub fn build_publisher(config: &StreamListenerConfig) -> Result<ListenerRuntime, ListenerError> {
    config
        .validate()
        .map_err(|e| ListenerError::misconfigured(format!("config invalid: {e}")))?;

    let runtime = ListenerRuntime::with_worker_threads(config.worker_threads)
        .map_err(|e| ListenerError::misconfigured(format!("unable to build runtime: {e}")))?;
    Ok(runtime.configure(|publisher| publisher.with_enabled(config.enabled)))
}

/// Build a publisher that spawns onto an existing runtime.
///
/// # Errors
///
/// Returns [`ListenerError::Misconfiguration`] when the configuration is invalid.
pub fn build_publisher_on(
    config: &StreamListenerConfig,
    handle: Handle,
) -> Result<StreamEventPublisher<TokioSpawner>, ListenerError> {
    config
        .validate()
        .map_err(|e| ListenerError::misconfigured(format!("config invalid: {e}")))?;
    Ok(StreamEventPublisher::new(TokioSpawner::new(handle)).with_enabled(config.enabled))
}
