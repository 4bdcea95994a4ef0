//! API-facing introspection models.

use serde::{Deserialize, Serialize};

use crate::core::{Spawn, StreamEventPublisher};

/// Registered endpoint as exposed to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    /// Endpoint identifier.
    pub id: String,
    /// Consumer-group label.
    pub group_id: String,
    /// Source identifier.
    pub topic: String,
    /// Rust type name of the records.
    pub record_type: String,
    /// Batch listener when true.
    pub batch: bool,
    /// Informational concurrency flag.
    pub concurrency: bool,
    /// Re-arm policy label (`continuous`, `cron`, `fixed_delay`).
    pub policy: String,
    /// Fixed delay between polls, in milliseconds.
    pub delay_ms: u64,
    /// Whether a cycle is in flight.
    pub running: bool,
    /// Whether a drive loop or re-arm chain is live.
    pub armed: bool,
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag; false once the publisher is shut down.
    pub ok: bool,
    /// Whether `startup` has run.
    pub started: bool,
    /// Registered endpoints.
    pub endpoints: usize,
}

/// Describe every registered endpoint, in registration order.
pub fn list_endpoints<S>(publisher: &StreamEventPublisher<S>) -> Vec<EndpointSnapshot>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    publisher
        .registered()
        .iter()
        .map(|endpoint| EndpointSnapshot {
            id: endpoint.id().to_string(),
            group_id: endpoint.group_id().to_string(),
            topic: endpoint.topic().to_string(),
            record_type: endpoint.record_type().to_string(),
            batch: endpoint.is_batch(),
            concurrency: endpoint.is_concurrency(),
            policy: endpoint.policy().label().to_string(),
            delay_ms: u64::try_from(endpoint.delay().as_millis()).unwrap_or(u64::MAX),
            running: publisher.is_running(endpoint.id()),
            armed: publisher.is_armed(endpoint.id()),
        })
        .collect()
}

/// Return a health payload.
pub fn health<S>(publisher: &StreamEventPublisher<S>) -> Health
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    Health {
        ok: !publisher.is_shutdown(),
        started: publisher.is_started(),
        endpoints: publisher.endpoint_ids().len(),
    }
}
