//! Tests for endpoint and publisher builders

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use prometheus_stream_listener::builders::{build_publisher, EndpointBuilder};
use prometheus_stream_listener::config::StreamListenerConfig;
use prometheus_stream_listener::core::{
    AppResult, BatchListener, DataProvider, EventIdAware, IdlePolicy, JsonRecordConverter,
    ListenerError, RearmPolicy, RecordListener, ResponseStatus, StreamListenerEndpoint,
};

#[derive(Debug, Clone, serde::Deserialize)]
struct Ping {
    id: i64,
    source: String,
}

impl EventIdAware for Ping {
    fn event_id(&self) -> &str {
        &self.source
    }

    fn id(&self) -> i64 {
        self.id
    }
}

struct NoopProvider;

#[async_trait]
impl DataProvider<Ping> for NoopProvider {
    async fn receive(&self, _endpoint: &StreamListenerEndpoint<Ping>) -> AppResult<Vec<Ping>> {
        Ok(Vec::new())
    }

    async fn commit(
        &self,
        _endpoint: &StreamListenerEndpoint<Ping>,
        _statuses: Vec<ResponseStatus>,
    ) -> AppResult<()> {
        Ok(())
    }
}

struct NoopListener;

#[async_trait]
impl RecordListener<Ping> for NoopListener {
    async fn on_record(&self, _record: &Ping) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BatchListener<Ping> for NoopListener {
    async fn on_batch(&self, _records: &[Ping]) -> AppResult<()> {
        Ok(())
    }
}

fn config() -> StreamListenerConfig {
    StreamListenerConfig {
        topics: Some("pings".into()),
        ..StreamListenerConfig::default()
    }
}

fn builder() -> EndpointBuilder<Ping> {
    EndpointBuilder::new("pingListener")
        .record_listener(NoopListener)
        .data_provider(Arc::new(NoopProvider))
}

#[test]
fn test_build_resolves_policy() {
    let endpoint = builder().build(&config()).unwrap();
    assert!(endpoint.id().starts_with("pingListener_"));
    assert!(!endpoint.is_batch());
    assert!(matches!(endpoint.rearm_policy(), RearmPolicy::Cron(_)));
    assert!(endpoint.record_type().ends_with("Ping"));

    let continuous = builder()
        .auto_startup(true)
        .idle_policy(IdlePolicy::Poll)
        .build(&config())
        .unwrap();
    assert!(matches!(
        continuous.rearm_policy(),
        RearmPolicy::Continuous { idle: IdlePolicy::Poll }
    ));

    let timer = builder().cron("-").delay(Duration::from_secs(2)).build(&config()).unwrap();
    assert!(matches!(timer.rearm_policy(), RearmPolicy::FixedDelay));
    assert_eq!(timer.delay(), Duration::from_secs(2));
}

#[test]
fn test_build_carries_properties() {
    let endpoint = builder()
        .properties("max.poll.records=10\ngroup.id=ignored")
        .build(&config())
        .unwrap();
    assert_eq!(
        endpoint.properties().get("max.poll.records").map(String::as_str),
        Some("10")
    );
    assert!(!endpoint.properties().contains_key("group.id"));
}

#[test]
fn test_missing_collaborators_are_misconfiguration() {
    let err = EndpointBuilder::<Ping>::new("orphan")
        .data_provider(Arc::new(NoopProvider))
        .build(&config())
        .unwrap_err();
    assert!(matches!(err, ListenerError::Misconfiguration(_)));

    let err = EndpointBuilder::<Ping>::new("orphan")
        .record_listener(NoopListener)
        .build(&config())
        .unwrap_err();
    assert!(matches!(err, ListenerError::Misconfiguration(_)));
}

#[test]
fn test_batch_flag_must_match_listener() {
    let mut options = prometheus_stream_listener::config::EndpointOptions {
        batch: Some(true),
        ..Default::default()
    };
    let err = builder().options(options.clone()).build(&config()).unwrap_err();
    assert!(matches!(err, ListenerError::Misconfiguration(_)));

    let endpoint = EndpointBuilder::<Ping>::new("pingBatch")
        .options(options.clone())
        .batch_listener(NoopListener)
        .data_provider(Arc::new(NoopProvider))
        .build(&config())
        .unwrap();
    assert!(endpoint.is_batch());

    options.batch = Some(false);
    assert!(builder().options(options).build(&config()).is_ok());
}

#[test]
fn test_invalid_cron_fails_before_registration() {
    let err = builder().cron("0 0 0 32 * *").build(&config()).unwrap_err();
    assert!(matches!(err, ListenerError::InvalidCron { .. }));
    assert!(err.is_registration_error());
}

#[test]
fn test_json_record_converter() {
    let endpoint = builder()
        .converter(Arc::new(JsonRecordConverter::<Ping>::new()))
        .build(&config())
        .unwrap();
    let converter = endpoint.record_converter().unwrap();

    let raw = json!({"id": 4, "source": "sensor-4"});
    let ping = converter
        .convert(raw.as_object().unwrap(), &endpoint)
        .unwrap();
    assert_eq!(ping.id, 4);
    assert_eq!(ping.event_id(), "sensor-4");

    let bad = json!({"id": "four"});
    let err = converter.convert(bad.as_object().unwrap(), &endpoint).unwrap_err();
    assert!(err.to_string().contains(endpoint.id()));
}

#[test]
fn test_build_publisher_owns_runtime() {
    let cfg = StreamListenerConfig {
        worker_threads: 2,
        ..config()
    };
    let runtime = build_publisher(&cfg).unwrap();
    runtime
        .publisher()
        .register(builder().id("ping").build(&cfg).unwrap())
        .unwrap();
    assert_eq!(runtime.publisher().startup(), 1);
    runtime.shutdown(Duration::from_secs(1));
}

#[test]
fn test_build_publisher_rejects_invalid_config() {
    let cfg = StreamListenerConfig {
        worker_threads: 0,
        ..config()
    };
    assert!(matches!(
        build_publisher(&cfg),
        Err(ListenerError::Misconfiguration(message)) if message.contains("config invalid")
    ));
}
