//! Runtime adapters and API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{health, list_endpoints, EndpointSnapshot, Health};
pub use tokio_spawner::{ListenerRuntime, TokioSpawner};
