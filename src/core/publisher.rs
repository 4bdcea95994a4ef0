//! Endpoint registry and scheduler.
//!
//! The publisher owns every registered endpoint and drives it with one of
//! three re-arm policies:
//!
//! - **continuous**: a drive loop runs a cycle, sleeps the fixed delay and
//!   runs again for as long as cycles keep finding records;
//! - **cron**: a driver task fires a tick on every cron match (in local
//!   time); a tick that found records re-arms itself on the fixed delay
//!   until the source runs dry;
//! - **fixed delay**: a timer chain that ticks, sleeps the delay and ticks
//!   again until shutdown.
//!
//! Every tick goes through the [`ConcurrencyGuard`], so two cycles for the
//! same endpoint id never overlap. A tick that finds the slot taken is
//! abandoned and logged at `debug`; it is never an error.
//!
//! A second id set tracks *armed* endpoints: at most one drive loop or
//! re-arm chain exists per endpoint. A cron fire or `trigger` that finds the
//! endpoint armed does nothing, so the fixed delay between two cycles holds
//! however often the cron expression fires.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::core::audit::{build_cycle_event, AuditSink, CycleAction};
use crate::core::error::panic_message;
use crate::core::execution::{CycleOutcome, ExecutionService};
use crate::core::stats::{ListenerCounters, ListenerStats};
use crate::core::{
    ConcurrencyGuard, EventIdAware, IdlePolicy, ListenerError, RearmPolicy,
    StreamListenerEndpoint,
};
use crate::runtime::TokioSpawner;

/// Where the publisher runs its drive loops, timers and cron drivers.
pub trait Spawn {
    /// Run `fut` in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Result of one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Records were processed; the endpoint may have more.
    Busy,
    /// The source returned no records.
    Idle,
    /// A cycle for the endpoint was already in flight; nothing ran.
    Contended,
    /// The data provider failed or the cycle panicked.
    Failed,
}

impl TickOutcome {
    /// Whether the endpoint should be driven again right away.
    #[must_use]
    pub const fn has_more(self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// Type-erased view of a registered endpoint.
#[async_trait]
pub(crate) trait ScheduledEndpoint: Send + Sync {
    fn id(&self) -> &str;
    fn group_id(&self) -> &str;
    fn topic(&self) -> &str;
    fn record_type(&self) -> &'static str;
    fn is_batch(&self) -> bool;
    fn is_concurrency(&self) -> bool;
    fn delay(&self) -> Duration;
    fn policy(&self) -> RearmPolicy;
    async fn run_cycle(&self, service: &ExecutionService) -> Result<CycleOutcome, ListenerError>;
}

#[async_trait]
impl<T: EventIdAware> ScheduledEndpoint for StreamListenerEndpoint<T> {
    fn id(&self) -> &str {
        Self::id(self)
    }

    fn group_id(&self) -> &str {
        Self::group_id(self)
    }

    fn topic(&self) -> &str {
        Self::topic(self)
    }

    fn record_type(&self) -> &'static str {
        Self::record_type(self)
    }

    fn is_batch(&self) -> bool {
        Self::is_batch(self)
    }

    fn is_concurrency(&self) -> bool {
        Self::is_concurrency(self)
    }

    fn delay(&self) -> Duration {
        Self::delay(self)
    }

    fn policy(&self) -> RearmPolicy {
        self.rearm_policy()
    }

    async fn run_cycle(&self, service: &ExecutionService) -> Result<CycleOutcome, ListenerError> {
        service.run_cycle(self).await
    }
}

/// How a timer-driven tick decides whether to schedule the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rearm {
    /// Always schedule the next tick after the delay.
    Always,
    /// Schedule the next tick only while the endpoint reports more work.
    WhileBusy,
}

/// State shared between the publisher handle and its scheduled tasks.
struct PublisherShared {
    endpoints: RwLock<Vec<Arc<dyn ScheduledEndpoint>>>,
    guard: ConcurrencyGuard,
    armed: ConcurrencyGuard,
    execution: ExecutionService,
    counters: ListenerCounters,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
    shutdown: CancellationToken,
    started: AtomicBool,
    enabled: AtomicBool,
}

impl PublisherShared {
    fn find(&self, id: &str) -> Result<Arc<dyn ScheduledEndpoint>, ListenerError> {
        self.endpoints
            .read()
            .iter()
            .find(|endpoint| endpoint.id() == id)
            .cloned()
            .ok_or_else(|| ListenerError::UnknownEndpoint(id.to_string()))
    }

    fn record_audit(&self, endpoint: &dyn ScheduledEndpoint, action: CycleAction, records: usize) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_cycle_event(
                endpoint.id(),
                endpoint.group_id(),
                action,
                records,
            ));
        }
    }

    /// Run one guarded cycle. The guard slot is released before returning.
    async fn tick(&self, endpoint: &dyn ScheduledEndpoint) -> TickOutcome {
        let Some(_permit) = self.guard.try_acquire(endpoint.id()) else {
            debug!(
                group_id = endpoint.group_id(),
                endpoint_id = endpoint.id(),
                "race condition detected, previous cycle still running"
            );
            self.counters.contended_ticks.fetch_add(1, Ordering::Relaxed);
            self.record_audit(endpoint, CycleAction::Contended, 0);
            return TickOutcome::Contended;
        };

        self.counters.cycles_started.fetch_add(1, Ordering::Relaxed);

        let result = match AssertUnwindSafe(endpoint.run_cycle(&self.execution))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(ListenerError::Panicked {
                endpoint: endpoint.id().to_string(),
                message: panic_message(payload.as_ref()),
            }),
        };

        match result {
            Ok(CycleOutcome::Idle) => {
                self.counters.cycles_idle.fetch_add(1, Ordering::Relaxed);
                self.record_audit(endpoint, CycleAction::Idle, 0);
                TickOutcome::Idle
            }
            Ok(CycleOutcome::Processed(summary)) => {
                self.counters.record_summary(&summary);
                self.record_audit(endpoint, CycleAction::Committed, summary.total());
                TickOutcome::Busy
            }
            Err(err) => {
                let records = match &err {
                    ListenerError::Commit { records, .. } => *records,
                    _ => 0,
                };
                error!(
                    group_id = endpoint.group_id(),
                    endpoint_id = endpoint.id(),
                    records,
                    error = %err,
                    "cycle failed"
                );
                self.counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
                self.record_audit(endpoint, CycleAction::Failed(err.to_string()), records);
                TickOutcome::Failed
            }
        }
    }

    /// Continuous drive loop: cycle, sleep the delay, cycle again.
    async fn drive(&self, endpoint: &dyn ScheduledEndpoint, idle: IdlePolicy) {
        let Some(_armed) = self.armed.try_acquire(endpoint.id()) else {
            debug!(endpoint_id = endpoint.id(), "endpoint already armed, drive skipped");
            return;
        };
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }

            match self.tick(endpoint).await {
                TickOutcome::Busy => {
                    trace!(endpoint_id = endpoint.id(), "call next cycle");
                }
                TickOutcome::Contended => return,
                TickOutcome::Idle | TickOutcome::Failed => {
                    if idle == IdlePolicy::Drain {
                        debug!(endpoint_id = endpoint.id(), "endpoint drained, drive loop stops");
                        return;
                    }
                }
            }

            if !pause(&self.shutdown, endpoint.delay()).await {
                return;
            }
        }
    }
}

/// Wait `delay`, returning false if shutdown was requested meanwhile.
async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !shutdown.is_cancelled();
    }
    tokio::select! {
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Owns the registered endpoints and schedules their cycles.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_stream_listener::core::StreamEventPublisher;
/// use prometheus_stream_listener::runtime::TokioSpawner;
///
/// let publisher = StreamEventPublisher::new(TokioSpawner::new(handle));
/// publisher.register(endpoint)?;
/// publisher.startup();
/// // ...
/// publisher.shutdown();
/// ```
pub struct StreamEventPublisher<S = TokioSpawner>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    shared: Arc<PublisherShared>,
    spawner: S,
}

impl<S> StreamEventPublisher<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create an enabled publisher with no endpoints.
    pub fn new(spawner: S) -> Self {
        Self {
            shared: Arc::new(PublisherShared {
                endpoints: RwLock::new(Vec::new()),
                guard: ConcurrencyGuard::new(),
                armed: ConcurrencyGuard::new(),
                execution: ExecutionService::new(),
                counters: ListenerCounters::default(),
                audit: Mutex::new(None),
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
                enabled: AtomicBool::new(true),
            }),
            spawner,
        }
    }

    /// Enable or disable scheduling. A disabled publisher accepts
    /// registrations but `startup` arms nothing.
    #[must_use]
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.shared.enabled.store(enabled, Ordering::Release);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.shared.audit.lock() = Some(audit);
        self
    }

    /// Register an endpoint.
    ///
    /// # Errors
    ///
    /// - [`ListenerError::DuplicateEndpoint`] if the id is already registered
    /// - [`ListenerError::RegistrationClosed`] once `startup` has run
    pub fn register<T: EventIdAware>(
        &self,
        endpoint: StreamListenerEndpoint<T>,
    ) -> Result<(), ListenerError> {
        let mut endpoints = self.shared.endpoints.write();

        if self.shared.started.load(Ordering::Acquire) {
            return Err(ListenerError::RegistrationClosed);
        }
        if endpoints.iter().any(|existing| existing.id() == endpoint.id()) {
            return Err(ListenerError::DuplicateEndpoint(endpoint.id().to_string()));
        }

        info!(
            group_id = endpoint.group_id(),
            endpoint_id = endpoint.id(),
            topic = endpoint.topic(),
            concurrency = endpoint.is_concurrency(),
            batch = endpoint.is_batch(),
            policy = endpoint.rearm_policy().label(),
            "endpoint successfully registered"
        );

        endpoints.push(Arc::new(endpoint));
        self.shared
            .counters
            .registered_endpoints
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Arm every registered endpoint according to its policy and close
    /// registration. Returns the number of endpoints armed.
    pub fn startup(&self) -> usize {
        let endpoints = {
            let endpoints = self.shared.endpoints.read();
            if self.shared.started.swap(true, Ordering::AcqRel) {
                warn!("publisher already started");
                return 0;
            }
            endpoints.clone()
        };

        if !self.shared.enabled.load(Ordering::Acquire) {
            info!(
                endpoints = endpoints.len(),
                "stream listener disabled, no endpoint armed"
            );
            return 0;
        }

        for endpoint in &endpoints {
            self.arm(Arc::clone(endpoint));
        }

        info!(endpoints = endpoints.len(), "stream listener publisher started");
        endpoints.len()
    }

    /// Cancel every pending timer and cron driver.
    ///
    /// Cycles already in flight run to completion; their guard slots are
    /// released when they finish, not here.
    pub fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        info!(
            in_flight = self.shared.guard.len(),
            "shutting down stream listener publisher"
        );
        self.shared.shutdown.cancel();
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Whether `startup` has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    /// Kick an endpoint outside of its schedule.
    ///
    /// A continuous endpoint gets a fresh drive loop (the way to revive a
    /// drained one); a timer or cron endpoint gets one tick that keeps
    /// re-arming on the fixed delay while it finds records. Nothing happens
    /// while the endpoint is armed, see [`StreamEventPublisher::is_armed`].
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::UnknownEndpoint`] if `id` is not registered.
    pub fn trigger(&self, id: &str) -> Result<(), ListenerError> {
        let endpoint = self.shared.find(id)?;
        if self.shared.shutdown.is_cancelled() {
            debug!(endpoint_id = id, "trigger ignored after shutdown");
            return Ok(());
        }
        match endpoint.policy() {
            RearmPolicy::Continuous { idle } => self.spawn_drive(endpoint, idle),
            RearmPolicy::Cron(_) | RearmPolicy::FixedDelay => {
                Self::schedule_tick(
                    Arc::clone(&self.shared),
                    &self.spawner,
                    endpoint,
                    Duration::ZERO,
                    Rearm::WhileBusy,
                );
            }
        }
        Ok(())
    }

    /// Run one guarded cycle for `id` in the caller's task.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::UnknownEndpoint`] if `id` is not registered.
    pub async fn tick(&self, id: &str) -> Result<TickOutcome, ListenerError> {
        let endpoint = self.shared.find(id)?;
        Ok(self.shared.tick(endpoint.as_ref()).await)
    }

    /// Run the continuous drive loop for `id` in the caller's task, until the
    /// endpoint drains, contends or shutdown is requested. Returns at once
    /// when the endpoint is already armed.
    ///
    /// Timer and cron endpoints are driven with [`IdlePolicy::Drain`].
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::UnknownEndpoint`] if `id` is not registered.
    pub async fn drive(&self, id: &str) -> Result<(), ListenerError> {
        let endpoint = self.shared.find(id)?;
        let idle = match endpoint.policy() {
            RearmPolicy::Continuous { idle } => idle,
            RearmPolicy::Cron(_) | RearmPolicy::FixedDelay => IdlePolicy::Drain,
        };
        self.shared.drive(endpoint.as_ref(), idle).await;
        Ok(())
    }

    /// Whether a cycle for `id` is in flight.
    #[must_use]
    pub fn is_running(&self, id: &str) -> bool {
        self.shared.guard.contains(id)
    }

    /// Whether a drive loop or re-arm chain for `id` is live.
    #[must_use]
    pub fn is_armed(&self, id: &str) -> bool {
        self.shared.armed.contains(id)
    }

    /// Ids of all registered endpoints, in registration order.
    #[must_use]
    pub fn endpoint_ids(&self) -> Vec<String> {
        self.shared
            .endpoints
            .read()
            .iter()
            .map(|endpoint| endpoint.id().to_string())
            .collect()
    }

    /// Get current publisher statistics.
    #[must_use]
    pub fn stats(&self) -> ListenerStats {
        self.shared.counters.snapshot()
    }

    pub(crate) fn registered(&self) -> Vec<Arc<dyn ScheduledEndpoint>> {
        self.shared.endpoints.read().clone()
    }

    fn arm(&self, endpoint: Arc<dyn ScheduledEndpoint>) {
        match endpoint.policy() {
            RearmPolicy::Continuous { idle } => self.spawn_drive(endpoint, idle),
            RearmPolicy::Cron(schedule) => {
                let shared = Arc::clone(&self.shared);
                let spawner = self.spawner.clone();
                self.spawner.spawn(async move {
                    Self::cron_driver(shared, spawner, endpoint, schedule).await;
                });
            }
            RearmPolicy::FixedDelay => Self::schedule_tick(
                Arc::clone(&self.shared),
                &self.spawner,
                endpoint,
                Duration::ZERO,
                Rearm::Always,
            ),
        }
    }

    fn spawn_drive(&self, endpoint: Arc<dyn ScheduledEndpoint>, idle: IdlePolicy) {
        let shared = Arc::clone(&self.shared);
        self.spawner.spawn(async move {
            shared.drive(endpoint.as_ref(), idle).await;
        });
    }

    /// Spawn a re-arm chain: wait `delay`, tick, and keep ticking on the
    /// fixed delay as `rearm` allows. The chain claims the endpoint's armed
    /// slot first and gives up if another chain or drive loop holds it.
    /// Ticks contain their own failures and panics, so one bad tick never
    /// ends an `Always` chain.
    fn schedule_tick(
        shared: Arc<PublisherShared>,
        spawner: &S,
        endpoint: Arc<dyn ScheduledEndpoint>,
        delay: Duration,
        rearm: Rearm,
    ) {
        spawner.spawn(async move {
            let Some(_armed) = shared.armed.try_acquire(endpoint.id()) else {
                debug!(
                    group_id = endpoint.group_id(),
                    endpoint_id = endpoint.id(),
                    "endpoint already armed, tick skipped"
                );
                return;
            };

            let mut delay = delay;
            loop {
                if !pause(&shared.shutdown, delay).await {
                    return;
                }

                let outcome = shared.tick(endpoint.as_ref()).await;
                let again = match rearm {
                    Rearm::Always => true,
                    Rearm::WhileBusy => outcome.has_more(),
                };
                if !again || shared.shutdown.is_cancelled() {
                    return;
                }

                trace!(
                    group_id = endpoint.group_id(),
                    endpoint_id = endpoint.id(),
                    "reschedule next tick"
                );
                delay = endpoint.delay();
            }
        });
    }

    async fn cron_driver(
        shared: Arc<PublisherShared>,
        spawner: S,
        endpoint: Arc<dyn ScheduledEndpoint>,
        schedule: crate::core::cron::CronSchedule,
    ) {
        loop {
            let Some(wait) = schedule.delay_until_next_in(&chrono::Local::now()) else {
                warn!(
                    endpoint_id = endpoint.id(),
                    cron = schedule.expression(),
                    "cron expression never fires, endpoint left unscheduled"
                );
                return;
            };

            if !pause(&shared.shutdown, wait).await {
                return;
            }

            Self::schedule_tick(
                Arc::clone(&shared),
                &spawner,
                Arc::clone(&endpoint),
                Duration::ZERO,
                Rearm::WhileBusy,
            );
        }
    }
}

impl<S> Drop for StreamEventPublisher<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        // Scheduled tasks hold the shared state; stop them with the handle.
        self.shared.shutdown.cancel();
    }
}
